use std::env;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use tracing::info;

/// Which scoring backend the admission filter uses for videos that survive
/// the cheap checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierMode {
    /// LLM judge producing a 0-100 humanity score.
    Judge,
    /// File-backed gradient-boosted model over extracted features.
    Model,
}

impl FromStr for ClassifierMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "judge" => Ok(ClassifierMode::Judge),
            "model" => Ok(ClassifierMode::Model),
            other => bail!("CLASSIFIER_MODE must be 'judge' or 'model', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Every tunable the pipeline consults lives here; none of the thresholds
/// are hardcoded at their call sites.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // External services
    pub youtube_api_key: String,
    pub openai_api_key: String,
    pub chat_model: String,
    pub embedding_model: String,

    // Storage
    pub database_url: String,
    pub blocklist_path: Option<String>,
    pub model_path: Option<String>,

    // Admission pipeline
    pub classifier_mode: ClassifierMode,
    pub max_videos_search_results: u32,
    pub exclude_videos_under_n_comments: u64,
    pub max_comments_to_assess: u32,
    pub min_duration_seconds: u32,
    pub min_videos_for_initial_load: usize,
    pub max_pages_to_fetch: u32,
    pub judge_admit_threshold: u8,
    pub model_threshold: f64,
    pub filter_batch_size: usize,
    /// Videos published before this date are trusted-human by convention.
    /// Available as a policy input; the admission state machine itself does
    /// not consult it.
    pub pre_ai_cutoff_date: DateTime<Utc>,

    // Web server
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from the environment (and a `.env` file if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let classifier_mode: ClassifierMode =
            optional_env("CLASSIFIER_MODE", "judge")?.parse()?;

        let config = Self {
            youtube_api_key: required_env("YOUTUBE_API_KEY")?,
            openai_api_key: required_env("OPENAI_API_KEY")?,
            chat_model: optional_env("CHAT_MODEL", "gpt-4o-mini")?,
            embedding_model: optional_env("EMBEDDING_MODEL", "text-embedding-3-small")?,
            database_url: optional_env("DATABASE_URL", "sqlite://truetone.db")?,
            blocklist_path: env::var("BLOCKLIST_PATH").ok(),
            model_path: env::var("MODEL_PATH").ok(),
            classifier_mode,
            max_videos_search_results: parsed_env("MAX_VIDEOS_SEARCH_RESULTS", 5)?,
            exclude_videos_under_n_comments: parsed_env("EXCLUDE_VIDEOS_UNDER_N_COMMENTS", 50)?,
            max_comments_to_assess: parsed_env("MAX_COMMENTS_TO_ASSESS_PER_VIDEO", 100)?,
            min_duration_seconds: parsed_env("MIN_DURATION_SECONDS", 60)?,
            min_videos_for_initial_load: parsed_env("MIN_VIDEOS_FOR_INITIAL_LOAD", 15)?,
            max_pages_to_fetch: parsed_env("MAX_PAGES_TO_FETCH", 50)?,
            judge_admit_threshold: parsed_env("JUDGE_ADMIT_THRESHOLD", 90)?,
            model_threshold: parsed_env("MODEL_THRESHOLD", 0.95)?,
            filter_batch_size: parsed_env("FILTER_BATCH_SIZE", 5)?,
            pre_ai_cutoff_date: cutoff_date_env()?,
            host: optional_env("HOST", "0.0.0.0")?,
            port: parsed_env("PORT", 3000)?,
        };

        if config.classifier_mode == ClassifierMode::Model && config.model_path.is_none() {
            bail!("MODEL_PATH is required when CLASSIFIER_MODE=model");
        }

        Ok(config)
    }

    /// Log non-secret configuration and key previews at startup.
    pub fn log_redacted(&self) {
        info!(
            youtube_api_key = %redact(&self.youtube_api_key),
            openai_api_key = %redact(&self.openai_api_key),
            chat_model = %self.chat_model,
            embedding_model = %self.embedding_model,
            database_url = %self.database_url,
            classifier_mode = ?self.classifier_mode,
            max_videos_search_results = self.max_videos_search_results,
            exclude_videos_under_n_comments = self.exclude_videos_under_n_comments,
            min_videos_for_initial_load = self.min_videos_for_initial_load,
            max_pages_to_fetch = self.max_pages_to_fetch,
            judge_admit_threshold = self.judge_admit_threshold,
            model_threshold = self.model_threshold,
            filter_batch_size = self.filter_batch_size,
            "Configuration loaded"
        );
    }
}

/// Configuration for the offline scraping binaries. A strict subset of
/// [`AppConfig`]: no chat backend, no server, no classifier.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub youtube_api_key: String,
    pub database_url: String,
    pub exclude_videos_under_n_comments: u64,
    pub max_comments_to_assess: u32,
    pub min_duration_seconds: u32,
}

impl ScrapeConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            youtube_api_key: required_env("YOUTUBE_API_KEY")?,
            database_url: optional_env("DATABASE_URL", "sqlite://truetone.db")?,
            exclude_videos_under_n_comments: parsed_env("EXCLUDE_VIDEOS_UNDER_N_COMMENTS", 50)?,
            max_comments_to_assess: parsed_env("MAX_COMMENTS_TO_ASSESS_PER_VIDEO", 100)?,
            min_duration_seconds: parsed_env("MIN_DURATION_SECONDS", 60)?,
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| anyhow!("{key} environment variable is required"))
}

fn optional_env(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn parsed_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn cutoff_date_env() -> Result<DateTime<Utc>> {
    match env::var("PRE_AI_CUTOFF_DATE") {
        Ok(raw) => raw
            .parse::<DateTime<Utc>>()
            .with_context(|| format!("PRE_AI_CUTOFF_DATE has an invalid value: {raw}")),
        // Public release month of the first mainstream generative models.
        Err(_) => Ok(Utc.with_ymd_and_hms(2022, 5, 1, 0, 0, 0).unwrap()),
    }
}

fn redact(secret: &str) -> String {
    if secret.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &secret[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_mode_parses_case_insensitive() {
        assert_eq!(
            "Judge".parse::<ClassifierMode>().unwrap(),
            ClassifierMode::Judge
        );
        assert_eq!(
            "model".parse::<ClassifierMode>().unwrap(),
            ClassifierMode::Model
        );
        assert!("other".parse::<ClassifierMode>().is_err());
    }

    #[test]
    fn redact_keeps_a_short_preview() {
        assert_eq!(redact("sk-abcdef"), "sk-a****");
        assert_eq!(redact("ab"), "****");
    }
}

use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use truetone_common::{AppConfig, ClassifierMode, Origin, VideoSummary};
use truetone_engine::{
    AdmissionFilter, DecisionCache, Embedder, FilterSettings, HumanityJudge, Scorer,
    SearchOrchestrator, SearchSettings, VideoLabeler, VideoStore,
};
use youtube_client::YouTubeClient;

pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: SearchOrchestrator,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
    #[serde(rename = "pageToken")]
    page_token: Option<String>,
}

fn missing_query() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "query parameter is required"})),
    )
        .into_response()
}

/// Streaming search: one JSON event per line, `text/x-ndjson`.
async fn search_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(query) = params.query.filter(|q| !q.trim().is_empty()) else {
        return missing_query();
    };

    let events = state.orchestrator.stream(query, params.page_token);
    let lines = events.map(|event| {
        let line = serde_json::to_string(&event).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize search event");
            r#"{"type":"error","message":"internal serialization failure"}"#.to_string()
        });
        Ok::<_, Infallible>(format!("{line}\n"))
    });

    (
        [(header::CONTENT_TYPE, "text/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Non-streaming search: the admitted subset of the first result page.
async fn search_json(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(query) = params.query.filter(|q| !q.trim().is_empty()) else {
        return missing_query();
    };

    match state.orchestrator.first_page(&query).await {
        Ok(summaries) => Json::<Vec<VideoSummary>>(summaries).into_response(),
        Err(e) => {
            warn!(query, error = %e, "Search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

fn build_scorer(config: &AppConfig) -> Result<Scorer> {
    match config.classifier_mode {
        ClassifierMode::Judge => {
            // The judge's reply is one small integer; cap the completion.
            let chat = OpenAi::new(&config.openai_api_key, &config.chat_model)
                .with_max_tokens(truetone_engine::judge::MAX_REPLY_TOKENS);
            Ok(Scorer::Judge(HumanityJudge::new(
                Arc::new(chat),
                config.max_comments_to_assess as usize,
            )))
        }
        ClassifierMode::Model => {
            let path = config
                .model_path
                .as_deref()
                .context("MODEL_PATH is required when CLASSIFIER_MODE=model")?;
            let labeler = VideoLabeler::load(path)
                .with_context(|| format!("failed to load model from {path}"))?;
            Ok(Scorer::Model {
                labeler,
                embedder: Arc::new(Embedder::new(
                    &config.openai_api_key,
                    &config.embedding_model,
                )),
            })
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", get(search_stream))
        .route("/api/search", get(search_json))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("truetone=info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    config.log_redacted();

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("invalid DATABASE_URL: {}", config.database_url))?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options)
        .await
        .context("failed to open database")?;

    let cache = DecisionCache::new(pool.clone());
    cache.init_schema().await?;
    let store = VideoStore::new(pool);
    store.init_schema().await?;

    if let Some(path) = &config.blocklist_path {
        let loaded = cache.load_blocklist_file(path).await?;
        info!(path, loaded, "Blocklist loaded");
    }

    let source = Arc::new(YouTubeClient::new(&config.youtube_api_key, Origin::App));
    let scorer = build_scorer(&config)?;

    let filter = AdmissionFilter::new(
        source.clone(),
        cache,
        store.clone(),
        scorer,
        FilterSettings {
            exclude_videos_under_n_comments: config.exclude_videos_under_n_comments,
            max_comments_to_assess: config.max_comments_to_assess,
            judge_admit_threshold: config.judge_admit_threshold,
            model_threshold: config.model_threshold,
            batch_size: config.filter_batch_size,
        },
    );

    let orchestrator = SearchOrchestrator::new(
        source,
        filter,
        store,
        SearchSettings {
            max_results_per_page: config.max_videos_search_results,
            min_comment_count: config.exclude_videos_under_n_comments,
            min_duration_seconds: config.min_duration_seconds,
            min_videos_for_initial_load: config.min_videos_for_initial_load,
            max_pages_to_fetch: config.max_pages_to_fetch,
        },
    );

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        config,
        orchestrator,
    });

    let app = build_router(state);

    info!("Truetone server starting on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Feature extraction: turns a video's description and comment set into the
//! fixed-shape numeric row the classifier was trained on.

use anyhow::Result;
use truetone_common::{Comment, Video};

use crate::embedder::TextEmbedder;
use crate::lists::{AI_KEYWORDS, GENERIC_PRAISE};
use crate::readability::flesch_reading_ease;
use crate::text::{clean_comment, count_emojis, word_count, URL_REGEX};

/// Number of columns in the tabular model input.
pub const NUM_FEATURES: usize = 15;

/// Column names in training order: description fields first, then comment
/// fields. The model artifact's own feature list is validated against this
/// at load time. `std` and `similarity_std` are both the pairwise-similarity
/// standard deviation; the training data carried the column twice and the
/// model contract keeps it that way.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "len",
    "readability_score",
    "num_links",
    "num_ai_keywords",
    "contains_ai_keywords",
    "average_len",
    "percent_short",
    "percent_duplicate",
    "emoji_density",
    "percent_unique_words",
    "generic_praise_ratio",
    "std",
    "variance",
    "mean_similarity",
    "similarity_std",
];

/// A comment is "short" when its raw text has at most this many words.
const SHORT_COMMENT_WORDS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionFeatures {
    pub len: usize,
    pub readability_score: f64,
    pub num_links: usize,
    pub num_ai_keywords: usize,
    pub contains_ai_keywords: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentFeatures {
    /// Average raw comment length in characters.
    pub average_len: f64,
    pub percent_short: f64,
    pub percent_duplicate: f64,
    /// Emoji occurrences per word across the concatenated raw comments.
    pub emoji_density: f64,
    pub percent_unique_words: f64,
    pub generic_praise_ratio: f64,
    /// Mean of the strictly-upper-triangular pairwise cosine similarities.
    pub mean_similarity: f64,
    /// Standard deviation of those same pairwise similarities.
    pub similarity_std: f64,
    /// Mean, across embedding dimensions, of the per-dimension standard
    /// deviation. A spread measure distinct from pairwise similarity.
    pub dimension_std: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub description: DescriptionFeatures,
    pub comments: CommentFeatures,
}

impl FeatureVector {
    /// The single-row tabular layout the model was trained on.
    pub fn to_row(&self) -> [f64; NUM_FEATURES] {
        let d = &self.description;
        let c = &self.comments;
        [
            d.len as f64,
            d.readability_score,
            d.num_links as f64,
            d.num_ai_keywords as f64,
            if d.contains_ai_keywords { 1.0 } else { 0.0 },
            c.average_len,
            c.percent_short,
            c.percent_duplicate,
            c.emoji_density,
            c.percent_unique_words,
            c.generic_praise_ratio,
            c.similarity_std,
            c.dimension_std,
            c.mean_similarity,
            c.similarity_std,
        ]
    }
}

/// Extract the full feature vector. Deterministic given identical inputs and
/// embedding model; inputs are never mutated. Zero comments yields a valid
/// vector with every comment-set field at 0.
pub async fn extract(
    video: &Video,
    comments: &[Comment],
    embedder: &dyn TextEmbedder,
) -> Result<FeatureVector> {
    let description = description_features(&video.description);

    if comments.is_empty() {
        return Ok(FeatureVector {
            description,
            comments: CommentFeatures::default(),
        });
    }

    let embeddings = embedder
        .embed_batch(comments.iter().map(|c| c.text.clone()).collect())
        .await?;

    Ok(FeatureVector {
        description,
        comments: comment_features(comments, &embeddings),
    })
}

fn description_features(description: &str) -> DescriptionFeatures {
    let num_ai_keywords = AI_KEYWORDS
        .iter()
        .filter(|keyword| description.to_lowercase().contains(*keyword))
        .count();

    DescriptionFeatures {
        len: description.len(),
        readability_score: flesch_reading_ease(description),
        num_links: URL_REGEX.find_iter(description).count(),
        num_ai_keywords,
        contains_ai_keywords: num_ai_keywords > 0,
    }
}

fn comment_features(comments: &[Comment], embeddings: &[Vec<f32>]) -> CommentFeatures {
    let n = comments.len();

    let mut seen_cleaned: Vec<String> = Vec::with_capacity(n);
    let mut raw_blob = String::new();
    let mut total_len = 0usize;
    let mut num_short = 0usize;
    let mut num_duplicates = 0usize;
    let mut num_generic_praise = 0usize;
    let mut unique_words: std::collections::HashSet<&str> = std::collections::HashSet::new();

    for comment in comments {
        let raw = comment.text.as_str();
        let cleaned = clean_comment(raw);

        // Length and short-word test on the raw text: emoji count here.
        total_len += raw.chars().count();
        if word_count(raw) <= SHORT_COMMENT_WORDS {
            num_short += 1;
        }

        // Duplicate test on the cleaned text: case, whitespace, and emoji
        // representation differences must not look distinct.
        if seen_cleaned.contains(&cleaned) {
            num_duplicates += 1;
        }
        seen_cleaned.push(cleaned);

        if GENERIC_PRAISE.iter().any(|phrase| raw.to_lowercase().contains(phrase)) {
            num_generic_praise += 1;
        }

        raw_blob.push(' ');
        raw_blob.push_str(raw);
        unique_words.extend(raw.split_whitespace());
    }

    let n_f = n as f64;
    let total_words = word_count(&raw_blob);
    let (emoji_density, percent_unique_words) = if total_words == 0 {
        (0.0, 0.0)
    } else {
        (
            count_emojis(&raw_blob) as f64 / total_words as f64,
            unique_words.len() as f64 / total_words as f64,
        )
    };

    let (mean_similarity, similarity_std) = pairwise_similarity_stats(embeddings);

    CommentFeatures {
        average_len: total_len as f64 / n_f,
        percent_short: num_short as f64 / n_f,
        percent_duplicate: num_duplicates as f64 / n_f,
        emoji_density,
        percent_unique_words,
        generic_praise_ratio: num_generic_praise as f64 / n_f,
        mean_similarity,
        similarity_std,
        dimension_std: mean_dimension_std(embeddings),
    }
}

/// Cosine similarity between two vectors. 0 for zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Mean and population standard deviation of the strictly-upper-triangular
/// entries of the pairwise cosine-similarity matrix. The diagonal is
/// excluded so self-similarity never inflates the statistics. Fewer than two
/// embeddings yields (0, 0).
pub fn pairwise_similarity_stats(embeddings: &[Vec<f32>]) -> (f64, f64) {
    let n = embeddings.len();
    if n < 2 {
        return (0.0, 0.0);
    }

    let mut sims = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            sims.push(cosine_similarity(&embeddings[i], &embeddings[j]));
        }
    }

    (mean(&sims), population_std(&sims))
}

/// Mean, across dimensions, of the per-dimension population standard
/// deviation over all embeddings.
pub fn mean_dimension_std(embeddings: &[Vec<f32>]) -> f64 {
    let n = embeddings.len();
    if n == 0 {
        return 0.0;
    }
    let dims = embeddings[0].len();
    if dims == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    for d in 0..dims {
        let column: Vec<f64> = embeddings.iter().map(|e| e[d] as f64).collect();
        total += population_std(&column);
    }
    total / dims as f64
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Utc;
    use truetone_common::{Channel, Label, Origin, Statistics};

    /// Deterministic stand-in embedder: hashes each text into a small vector.
    struct StubEmbedder;

    #[async_trait::async_trait]
    impl TextEmbedder for StubEmbedder {
        async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let h = t.bytes().fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
                    vec![
                        (h % 97) as f32 / 97.0,
                        (h % 89) as f32 / 89.0,
                        (h % 83) as f32 / 83.0,
                        1.0,
                    ]
                })
                .collect())
        }
    }

    fn video(description: &str) -> Video {
        Video {
            id: "vid1".into(),
            title: "A song".into(),
            description: description.into(),
            url: Video::watch_url("vid1"),
            thumbnail_url: "https://example.com/t.jpg".into(),
            channel: Channel {
                id: "UCchan".into(),
                name: "chan".into(),
            },
            statistics: Statistics::default(),
            duration_seconds: 240,
            published_at: Utc::now(),
            is_livestream: false,
            contains_synthetic_media: false,
            label: Label::Unlabelled,
            origin: Origin::App,
        }
    }

    fn comment(id: &str, text: &str) -> Comment {
        Comment {
            id: id.into(),
            video_id: "vid1".into(),
            text: text.into(),
            author_channel_id: "UCauthor".into(),
            author_display_name: "author".into(),
            likes: 0,
            is_reply: false,
            parent_comment_id: None,
            published_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn zero_comments_yield_all_zero_comment_features() {
        let features = extract(&video("some description"), &[], &StubEmbedder)
            .await
            .unwrap();
        assert_eq!(features.comments, CommentFeatures::default());

        // The vector is still fixed-shape and finite.
        let row = features.to_row();
        assert_eq!(row.len(), NUM_FEATURES);
        assert!(row.iter().all(|v| v.is_finite()));
    }

    #[tokio::test]
    async fn description_features_count_links_and_keywords() {
        let features = extract(
            &video("Made with Suno. Listen: https://example.com/a and https://example.com/b"),
            &[],
            &StubEmbedder,
        )
        .await
        .unwrap();

        assert_eq!(features.description.num_links, 2);
        assert!(features.description.contains_ai_keywords);
        assert!(features.description.num_ai_keywords >= 1);
    }

    #[tokio::test]
    async fn case_and_whitespace_variants_are_duplicates() {
        let comments = vec![
            comment("c1", "Great Song"),
            comment("c2", "  great song  "),
            comment("c3", "GREAT SONG"),
        ];
        let features = extract(&video("d"), &comments, &StubEmbedder).await.unwrap();
        // First occurrence is distinct, the other two are duplicates.
        assert!((features.comments.percent_duplicate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn emoji_variants_are_duplicates_after_normalization() {
        let comments = vec![comment("c1", "nice \u{1F525}"), comment("c2", "NICE :fire:")];
        let features = extract(&video("d"), &comments, &StubEmbedder).await.unwrap();
        assert!((features.comments.percent_duplicate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn short_comments_are_measured_on_raw_text() {
        let comments = vec![
            comment("c1", "one two three four five six seven eight"),
            comment("c2", "\u{1F525} \u{1F525}"),
        ];
        let features = extract(&video("d"), &comments, &StubEmbedder).await.unwrap();
        assert!((features.comments.percent_short - 0.5).abs() < 1e-9);
    }

    #[test]
    fn identical_embeddings_have_similarity_one_and_no_spread() {
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let (mean_sim, sim_std) = pairwise_similarity_stats(&embeddings);
        assert!((mean_sim - 1.0).abs() < 1e-9);
        assert!(sim_std.abs() < 1e-9);
        assert!(mean_dimension_std(&embeddings).abs() < 1e-9);
    }

    #[test]
    fn fewer_than_two_embeddings_yield_zero_stats() {
        assert_eq!(pairwise_similarity_stats(&[]), (0.0, 0.0));
        assert_eq!(pairwise_similarity_stats(&[vec![1.0, 2.0]]), (0.0, 0.0));
    }

    /// The strictly-upper-triangular mean equals the subtract-N form
    /// `(sum(S) - N) / (N * (N - 1))` whenever the diagonal is exactly 1,
    /// which cosine self-similarity guarantees.
    #[test]
    fn upper_triangular_mean_matches_subtract_n_formula() {
        let embeddings = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.6, 0.8, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.5, 0.5, 0.707],
        ];
        let n = embeddings.len();

        let (upper_mean, _) = pairwise_similarity_stats(&embeddings);

        let mut full_sum = 0.0;
        for a in &embeddings {
            for b in &embeddings {
                full_sum += cosine_similarity(a, b);
            }
        }
        // Full matrix is symmetric with a unit diagonal; each off-diagonal
        // pair appears twice.
        let subtract_n_mean = (full_sum - n as f64) / (n * (n - 1)) as f64;

        assert!((upper_mean - subtract_n_mean).abs() < 1e-9);
    }
}

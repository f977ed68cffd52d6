//! Per-video admission state machine and batched concurrent evaluation.
//!
//! Checks run in a fixed order, first match wins: blocklist, prior cached
//! decision, empty comment set, synthetic-media self-flag, comment-count
//! threshold, then the configured scorer. Every fresh rejection from a cheap
//! check is cached at score 0; cache hits are reused as-is and never
//! re-written. A failure while evaluating one video downgrades to a
//! rejection for that video only and never aborts the batch.

use std::sync::Arc;

use futures::{stream, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use truetone_common::{Label, Video};

use crate::cache::DecisionCache;
use crate::embedder::TextEmbedder;
use crate::features;
use crate::judge::HumanityJudge;
use crate::labeler::VideoLabeler;
use crate::source::VideoSource;
use crate::store::VideoStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    Blocklisted,
    Cached,
    NoComments,
    SelfFlaggedSynthetic,
    BelowCommentThreshold,
    Scored,
    EvaluationFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub admitted: bool,
    pub score: u8,
    pub reason: DecisionReason,
}

impl Decision {
    fn rejected(reason: DecisionReason) -> Self {
        Self {
            admitted: false,
            score: 0,
            reason,
        }
    }
}

/// Scoring backend for videos that survive the cheap checks.
#[derive(Clone)]
pub enum Scorer {
    Judge(HumanityJudge),
    Model {
        labeler: VideoLabeler,
        embedder: Arc<dyn TextEmbedder>,
    },
}

#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub exclude_videos_under_n_comments: u64,
    pub max_comments_to_assess: u32,
    pub judge_admit_threshold: u8,
    pub model_threshold: f64,
    pub batch_size: usize,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            exclude_videos_under_n_comments: 50,
            max_comments_to_assess: 100,
            judge_admit_threshold: 90,
            model_threshold: 0.95,
            batch_size: 5,
        }
    }
}

#[derive(Clone)]
pub struct AdmissionFilter {
    source: Arc<dyn VideoSource>,
    cache: DecisionCache,
    store: VideoStore,
    scorer: Scorer,
    settings: FilterSettings,
}

impl AdmissionFilter {
    pub fn new(
        source: Arc<dyn VideoSource>,
        cache: DecisionCache,
        store: VideoStore,
        scorer: Scorer,
        settings: FilterSettings,
    ) -> Self {
        Self {
            source,
            cache,
            store,
            scorer,
            settings,
        }
    }

    /// Run the admission state machine for one video. Infallible by
    /// contract: every internal failure becomes a rejection.
    pub async fn evaluate(&self, video: &Video) -> Decision {
        if self.cache.is_blocklisted(&video.channel.id).await {
            debug!(video_id = %video.id, channel_id = %video.channel.id, "Channel is blocklisted");
            // Decide once even here: an existing entry is replayed, never
            // rewritten.
            if let Some((score, admitted)) = self.cache.get(&video.id).await {
                return Decision {
                    admitted,
                    score,
                    reason: DecisionReason::Cached,
                };
            }
            self.cache.put(&video.id, 0, false).await;
            return Decision::rejected(DecisionReason::Blocklisted);
        }

        if let Some((score, admitted)) = self.cache.get(&video.id).await {
            return Decision {
                admitted,
                score,
                reason: DecisionReason::Cached,
            };
        }

        let comments = match self
            .source
            .get_comments(&video.id, self.settings.max_comments_to_assess)
            .await
        {
            Ok(comments) => comments,
            Err(e) => {
                warn!(video_id = %video.id, error = %e, "Comment fetch failed, rejecting");
                return Decision::rejected(DecisionReason::EvaluationFailed);
            }
        };

        if let Err(e) = self.store.upsert_comments(&comments).await {
            warn!(video_id = %video.id, error = %e, "Failed to persist comments");
        }

        if comments.is_empty() {
            self.cache.put(&video.id, 0, false).await;
            return Decision::rejected(DecisionReason::NoComments);
        }

        if video.contains_synthetic_media {
            debug!(video_id = %video.id, "Video self-reports synthetic media");
            self.cache.put(&video.id, 0, false).await;
            return Decision::rejected(DecisionReason::SelfFlaggedSynthetic);
        }

        if video.statistics.comments < self.settings.exclude_videos_under_n_comments {
            self.cache.put(&video.id, 0, false).await;
            return Decision::rejected(DecisionReason::BelowCommentThreshold);
        }

        match &self.scorer {
            Scorer::Judge(judge) => match judge.score(video, &comments).await {
                Ok(score) => {
                    let admitted = score >= self.settings.judge_admit_threshold;
                    self.cache.put(&video.id, score, admitted).await;
                    Decision {
                        admitted,
                        score,
                        reason: DecisionReason::Scored,
                    }
                }
                Err(e) => {
                    warn!(video_id = %video.id, error = %e, "Judge failed, rejecting");
                    Decision::rejected(DecisionReason::EvaluationFailed)
                }
            },
            Scorer::Model { labeler, embedder } => {
                match features::extract(video, &comments, embedder.as_ref()).await {
                    Ok(vector) => {
                        let (raw, label) = labeler.predict(&vector, self.settings.model_threshold);
                        let admitted = label == Label::Human;
                        let score = (raw * 100.0).round().clamp(0.0, 100.0) as u8;
                        self.cache.put(&video.id, score, admitted).await;
                        Decision {
                            admitted,
                            score,
                            reason: DecisionReason::Scored,
                        }
                    }
                    Err(e) => {
                        warn!(video_id = %video.id, error = %e, "Feature extraction failed, rejecting");
                        Decision::rejected(DecisionReason::EvaluationFailed)
                    }
                }
            }
        }
    }

    /// Evaluate one video and return it relabelled if admitted. The label is
    /// persisted for every fresh decision; cache hits are left alone.
    async fn process(&self, video: &Video) -> Option<Video> {
        let decision = self.evaluate(video).await;
        debug!(
            video_id = %video.id,
            admitted = decision.admitted,
            score = decision.score,
            reason = ?decision.reason,
            "Video evaluated"
        );

        let mut labelled = video.clone();
        labelled.label = if decision.admitted {
            Label::Human
        } else {
            Label::Ai
        };
        if decision.reason != DecisionReason::Cached {
            self.store.try_upsert_video(&labelled).await;
        }

        decision.admitted.then_some(labelled)
    }

    /// Blocking form: evaluate everything and return the admitted subset.
    pub async fn filter(&self, videos: Vec<Video>) -> Vec<Video> {
        let mut admitted = Vec::new();
        for batch in videos.chunks(self.settings.batch_size) {
            let evaluations: Vec<_> = batch.iter().map(|video| self.process(video)).collect();
            let results: Vec<Option<Video>> = stream::iter(evaluations)
                .buffer_unordered(self.settings.batch_size)
                .collect()
                .await;
            admitted.extend(results.into_iter().flatten());
        }
        admitted
    }

    /// Streaming form: a finite, non-restartable sequence of admitted
    /// videos. Batches run concurrently; each batch's admissions are all
    /// sent before the next batch starts, so ordering across batches is
    /// preserved.
    pub fn filter_streaming(&self, videos: Vec<Video>) -> impl Stream<Item = Video> + Send {
        let (tx, mut rx) = mpsc::channel::<Video>(16);
        let filter = self.clone();

        tokio::spawn(async move {
            for batch in videos.chunks(filter.settings.batch_size) {
                // Each future owns its video and a filter handle; borrowing
                // from the chunk does not satisfy the spawned task's
                // 'static bound.
                let evaluations = batch.to_vec().into_iter().map(|video| {
                    let filter = filter.clone();
                    async move { filter.process(&video).await }
                });
                let results: Vec<Option<Video>> = stream::iter(evaluations)
                    .buffer_unordered(filter.settings.batch_size)
                    .collect()
                    .await;
                for video in results.into_iter().flatten() {
                    if tx.send(video).await.is_err() {
                        // Consumer went away; stop evaluating.
                        return;
                    }
                }
            }
        });

        async_stream::stream! {
            while let Some(video) = rx.recv().await {
                yield video;
            }
        }
    }
}

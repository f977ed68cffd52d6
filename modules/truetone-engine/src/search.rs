//! Search orchestration: fetch result pages, pre-filter, run admission, and
//! emit a finite event stream the server can frame as NDJSON.

use std::pin::pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use truetone_common::{Video, VideoSummary};

use crate::filter::AdmissionFilter;
use crate::source::VideoSource;
use crate::store::VideoStore;

/// One line of the event stream. `status` lines are human-readable progress,
/// `video` lines carry admitted results, and every stream ends with exactly
/// one `done` or `error` line.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchEvent {
    Status {
        message: String,
    },
    Video {
        data: VideoSummary,
    },
    Done {
        count: usize,
        #[serde(rename = "nextPageToken")]
        next_page_token: Option<String>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub max_results_per_page: u32,
    pub min_comment_count: u64,
    pub min_duration_seconds: u32,
    pub min_videos_for_initial_load: usize,
    pub max_pages_to_fetch: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results_per_page: 5,
            min_comment_count: 50,
            min_duration_seconds: 60,
            min_videos_for_initial_load: 15,
            max_pages_to_fetch: 50,
        }
    }
}

#[derive(Clone)]
pub struct SearchOrchestrator {
    source: Arc<dyn VideoSource>,
    filter: AdmissionFilter,
    store: VideoStore,
    settings: SearchSettings,
}

impl SearchOrchestrator {
    pub fn new(
        source: Arc<dyn VideoSource>,
        filter: AdmissionFilter,
        store: VideoStore,
        settings: SearchSettings,
    ) -> Self {
        Self {
            source,
            filter,
            store,
            settings,
        }
    }

    /// Stream admitted videos for a query.
    ///
    /// With no page token this is an initial load: pages are fetched until
    /// enough videos have been admitted, results run out, or the page budget
    /// is exhausted. With a token exactly one page is processed. The stream
    /// is finite and always terminates with `Done` or `Error`.
    pub fn stream(
        &self,
        query: String,
        page_token: Option<String>,
    ) -> impl Stream<Item = SearchEvent> + Send {
        let (tx, mut rx) = mpsc::channel::<SearchEvent>(32);
        let orchestrator = self.clone();

        tokio::spawn(async move {
            if let Err(e) = orchestrator.run(&query, page_token, &tx).await {
                error!(query, error = %e, "Search stream failed");
                let _ = tx
                    .send(SearchEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
            }
        });

        async_stream::stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        }
    }

    async fn run(
        &self,
        query: &str,
        page_token: Option<String>,
        tx: &mpsc::Sender<SearchEvent>,
    ) -> Result<()> {
        let is_initial_load = page_token.is_none();
        let mut current_token = page_token;
        let mut next_page_token: Option<String>;
        let mut count = 0usize;
        let mut pages_fetched = 0u32;

        if !emit(tx, status("Searching...")).await {
            return Ok(());
        }

        loop {
            let page = self
                .source
                .search_videos(query, self.settings.max_results_per_page, current_token.as_deref())
                .await
                .context("video search failed")?;
            pages_fetched += 1;
            next_page_token = page.next_page_token;

            let survivors = self.pre_filter(page.videos).await;

            let mut admitted = pin!(self.filter.filter_streaming(survivors));
            while let Some(video) = admitted.next().await {
                count += 1;
                if !emit(
                    tx,
                    SearchEvent::Video {
                        data: VideoSummary::from(&video),
                    },
                )
                .await
                {
                    return Ok(());
                }
                let plural = if count == 1 { "" } else { "s" };
                if !emit(tx, status(&format!("Found {count} video{plural}..."))).await {
                    return Ok(());
                }
            }

            if !is_initial_load {
                break;
            }
            if count >= self.settings.min_videos_for_initial_load {
                break;
            }
            if next_page_token.is_none() {
                info!(query, count, "Search results exhausted");
                break;
            }
            if pages_fetched >= self.settings.max_pages_to_fetch {
                warn!(
                    query,
                    count,
                    pages_fetched,
                    "Page budget exhausted before finding enough videos"
                );
                break;
            }
            current_token = next_page_token.clone();
        }

        info!(query, count, pages_fetched, "Search finished");
        emit(
            tx,
            SearchEvent::Done {
                count,
                next_page_token,
            },
        )
        .await;
        Ok(())
    }

    /// Non-streaming variant: one page of results, admitted subset only.
    pub async fn first_page(&self, query: &str) -> Result<Vec<VideoSummary>> {
        let page = self
            .source
            .search_videos(query, self.settings.max_results_per_page, None)
            .await
            .context("video search failed")?;
        let survivors = self.pre_filter(page.videos).await;
        let admitted = self.filter.filter(survivors).await;
        Ok(admitted.iter().map(VideoSummary::from).collect())
    }

    /// Cheap checks that need no network: platform-reported comment count
    /// and duration. Survivors are persisted before admission runs.
    async fn pre_filter(&self, videos: Vec<Video>) -> Vec<Video> {
        let mut survivors = Vec::with_capacity(videos.len());
        for video in videos {
            if video.statistics.comments < self.settings.min_comment_count {
                continue;
            }
            if video.duration_seconds <= self.settings.min_duration_seconds {
                continue;
            }
            self.store.try_upsert_video(&video).await;
            survivors.push(video);
        }
        survivors
    }
}

fn status(message: &str) -> SearchEvent {
    SearchEvent::Status {
        message: message.to_string(),
    }
}

/// Send an event; a closed channel means the client went away, which stops
/// the stream without treating it as an error.
async fn emit(tx: &mpsc::Sender<SearchEvent>, event: SearchEvent) -> bool {
    tx.send(event).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_to_the_wire_shape() {
        let done = SearchEvent::Done {
            count: 3,
            next_page_token: Some("tok".into()),
        };
        assert_eq!(
            serde_json::to_string(&done).unwrap(),
            r#"{"type":"done","count":3,"nextPageToken":"tok"}"#
        );

        let status = SearchEvent::Status {
            message: "Searching...".into(),
        };
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            r#"{"type":"status","message":"Searching..."}"#
        );
    }
}

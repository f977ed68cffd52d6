//! End-to-end tests of the search orchestrator over mock backends: paging,
//! stop conditions, event framing, and pre-filtering.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use sqlx::SqlitePool;

use ai_client::traits::ChatAgent;
use truetone_common::{Channel, Comment, Label, Origin, Statistics, Video};
use truetone_engine::{
    AdmissionFilter, DecisionCache, FilterSettings, HumanityJudge, Scorer, SearchEvent,
    SearchOrchestrator, SearchSettings, VideoSource, VideoStore,
};
use youtube_client::{VideoPage, YouTubeError};

struct FixedChat(String);

#[async_trait]
impl ChatAgent for FixedChat {
    async fn chat_completion(&self, _system: &str, _user: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct PagedSource {
    pages: Vec<VideoPage>,
    search_calls: AtomicUsize,
    fail_search: bool,
}

impl PagedSource {
    fn new(pages: Vec<VideoPage>) -> Arc<Self> {
        Arc::new(Self {
            pages,
            search_calls: AtomicUsize::new(0),
            fail_search: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            pages: Vec::new(),
            search_calls: AtomicUsize::new(0),
            fail_search: true,
        })
    }

    fn calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoSource for PagedSource {
    async fn search_videos(
        &self,
        _query: &str,
        _max_results: u32,
        page_token: Option<&str>,
    ) -> youtube_client::Result<VideoPage> {
        let call = self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(YouTubeError::Api {
                status: 403,
                message: "quotaExceeded".into(),
            });
        }
        // Tokens are "page-N"; no token means the first page.
        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(call),
        };
        Ok(self.pages[index].clone())
    }

    async fn get_channel_videos(
        &self,
        _channel_id: &str,
        _max_videos: usize,
    ) -> youtube_client::Result<Vec<Video>> {
        unimplemented!("not used by search tests")
    }

    async fn get_comments(
        &self,
        video_id: &str,
        _max_results: u32,
    ) -> youtube_client::Result<Vec<Comment>> {
        Ok((0..60)
            .map(|i| Comment {
                id: format!("{video_id}-c{i}"),
                video_id: video_id.to_string(),
                text: format!("comment {i} on {video_id}"),
                author_channel_id: format!("UCauthor{i}"),
                author_display_name: format!("author {i}"),
                likes: 0,
                is_reply: false,
                parent_comment_id: None,
                published_at: Utc::now(),
            })
            .collect())
    }
}

fn video(id: &str) -> Video {
    Video {
        id: id.into(),
        title: format!("song {id}"),
        description: "a song".into(),
        url: Video::watch_url(id),
        thumbnail_url: "https://example.com/t.jpg".into(),
        channel: Channel {
            id: "UCuAXFkgsw1L7xaCfnd5JJOw".into(),
            name: "the band".into(),
        },
        statistics: Statistics {
            views: 1000,
            likes: 10,
            favorites: 0,
            comments: 80,
        },
        duration_seconds: 300,
        published_at: Utc::now(),
        is_livestream: false,
        contains_synthetic_media: false,
        label: Label::Unlabelled,
        origin: Origin::App,
    }
}

fn page(prefix: &str, n: usize, next: Option<&str>) -> VideoPage {
    VideoPage {
        videos: (0..n).map(|i| video(&format!("{prefix}{i}"))).collect(),
        next_page_token: next.map(str::to_string),
    }
}

async fn orchestrator(source: Arc<PagedSource>, reply: &str) -> SearchOrchestrator {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    let cache = DecisionCache::new(pool.clone());
    cache.init_schema().await.unwrap();
    let store = VideoStore::new(pool);
    store.init_schema().await.unwrap();

    let judge = HumanityJudge::new(Arc::new(FixedChat(reply.to_string())), 100);
    let filter = AdmissionFilter::new(
        source.clone(),
        cache,
        store.clone(),
        Scorer::Judge(judge),
        FilterSettings::default(),
    );
    SearchOrchestrator::new(source, filter, store, SearchSettings::default())
}

async fn collect(
    orchestrator: &SearchOrchestrator,
    query: &str,
    token: Option<&str>,
) -> Vec<SearchEvent> {
    orchestrator
        .stream(query.to_string(), token.map(str::to_string))
        .collect()
        .await
}

fn admitted_count(events: &[SearchEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SearchEvent::Video { .. }))
        .count()
}

#[tokio::test]
async fn initial_load_pages_until_enough_videos_are_admitted() {
    let source = PagedSource::new(vec![
        page("a", 6, Some("page-1")),
        page("b", 6, Some("page-2")),
        page("c", 6, Some("page-3")),
        page("d", 6, None),
    ]);
    let orchestrator = orchestrator(source.clone(), "95").await;

    let events = collect(&orchestrator, "lofi beats", None).await;

    // Three pages of six admissions reach the target of fifteen.
    assert_eq!(source.calls(), 3);
    assert_eq!(admitted_count(&events), 18);
    assert_eq!(
        events.last(),
        Some(&SearchEvent::Done {
            count: 18,
            next_page_token: Some("page-3".into()),
        })
    );
}

#[tokio::test]
async fn page_token_requests_process_exactly_one_page() {
    let source = PagedSource::new(vec![
        page("a", 6, Some("page-1")),
        page("b", 6, Some("page-2")),
    ]);
    let orchestrator = orchestrator(source.clone(), "95").await;

    let events = collect(&orchestrator, "lofi beats", Some("page-1")).await;

    // One page even though fewer than fifteen were admitted and a next
    // token was available.
    assert_eq!(source.calls(), 1);
    assert_eq!(admitted_count(&events), 6);
    assert_eq!(
        events.last(),
        Some(&SearchEvent::Done {
            count: 6,
            next_page_token: Some("page-2".into()),
        })
    );
}

#[tokio::test]
async fn page_token_requests_never_paginate_even_with_zero_admissions() {
    let source = PagedSource::new(vec![
        page("a", 6, Some("page-1")),
        page("b", 6, Some("page-2")),
    ]);
    let orchestrator = orchestrator(source.clone(), "50").await;

    let events = collect(&orchestrator, "lofi beats", Some("page-1")).await;

    assert_eq!(source.calls(), 1);
    assert_eq!(admitted_count(&events), 0);
    assert_eq!(
        events.last(),
        Some(&SearchEvent::Done {
            count: 0,
            next_page_token: Some("page-2".into()),
        })
    );
}

#[tokio::test]
async fn initial_load_stops_when_results_run_out() {
    let source = PagedSource::new(vec![page("a", 3, None)]);
    let orchestrator = orchestrator(source.clone(), "95").await;

    let events = collect(&orchestrator, "lofi beats", None).await;

    assert_eq!(source.calls(), 1);
    assert_eq!(
        events.last(),
        Some(&SearchEvent::Done {
            count: 3,
            next_page_token: None,
        })
    );
}

#[tokio::test]
async fn rejected_videos_produce_no_video_events() {
    let source = PagedSource::new(vec![page("a", 4, None)]);
    let orchestrator = orchestrator(source.clone(), "50").await;

    let events = collect(&orchestrator, "lofi beats", None).await;

    assert_eq!(admitted_count(&events), 0);
    assert_eq!(
        events.last(),
        Some(&SearchEvent::Done {
            count: 0,
            next_page_token: None,
        })
    );
}

#[tokio::test]
async fn search_failure_ends_the_stream_with_an_error_event() {
    let source = PagedSource::failing();
    let orchestrator = orchestrator(source, "95").await;

    let events = collect(&orchestrator, "lofi beats", None).await;

    assert!(matches!(
        events.last(),
        Some(SearchEvent::Error { message }) if message.contains("search failed")
    ));
    // No Done after an Error.
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SearchEvent::Done { .. }))
            .count(),
        0
    );
}

#[tokio::test]
async fn stream_opens_with_a_searching_status() {
    let source = PagedSource::new(vec![page("a", 1, None)]);
    let orchestrator = orchestrator(source, "95").await;

    let events = collect(&orchestrator, "lofi beats", None).await;

    assert_eq!(
        events.first(),
        Some(&SearchEvent::Status {
            message: "Searching...".into(),
        })
    );
    // The single admission is followed by a singular progress line.
    assert!(events.contains(&SearchEvent::Status {
        message: "Found 1 video...".into(),
    }));
}

#[tokio::test]
async fn pre_filter_drops_short_and_sparsely_commented_videos() {
    let mut shorts = page("a", 2, None);
    shorts.videos[0].duration_seconds = 45;
    shorts.videos[1].statistics.comments = 10;
    let source = PagedSource::new(vec![shorts]);
    let orchestrator = orchestrator(source, "95").await;

    let events = collect(&orchestrator, "lofi beats", None).await;

    assert_eq!(admitted_count(&events), 0);
}

#[tokio::test]
async fn first_page_returns_admitted_summaries() {
    let source = PagedSource::new(vec![page("a", 3, Some("page-1"))]);
    let orchestrator = orchestrator(source.clone(), "95").await;

    let summaries = orchestrator.first_page("lofi beats").await.unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(summaries.len(), 3);
    assert!(summaries.iter().all(|s| s.url.contains(&s.video_id)));
}

// src/services/crawler.rs

//! Incremental, cursor-based crawl of a forum feed into the post store.
//!
//! ```text
//! Bootstrapping ──ok──▶ Paging ──budget reached / empty page──▶ Done
//!       │                  │
//!       └──error──▶ Failed ◀──page error / session expired
//! ```
//!
//! Pages are requested newest first; each page's last id becomes the cursor
//! for the next. Every awaited call is sequential.

use serde::Serialize;

use crate::error::AppError;
use crate::models::{FeedConfig, InsertOutcome, Session};
use crate::services::feed::FeedTransport;
use crate::services::session::SessionBootstrapper;
use crate::storage::PostStore;
use crate::utils::pause;
use crate::utils::time::normalize_post_date;

/// Where a crawl run is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlState {
    Bootstrapping,
    Paging,
    Done,
    Failed,
}

/// Summary of a crawl run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub state: CrawlState,
    pub pages_fetched: usize,
    /// Posts whose content was fetched; this is what the budget counts
    pub posts_processed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub store_failures: usize,
    pub fetch_failures: usize,
    pub last_cursor: Option<String>,
    pub error: Option<String>,
}

impl CrawlReport {
    fn new() -> Self {
        Self {
            state: CrawlState::Bootstrapping,
            pages_fetched: 0,
            posts_processed: 0,
            inserted: 0,
            duplicates: 0,
            store_failures: 0,
            fetch_failures: 0,
            last_cursor: None,
            error: None,
        }
    }

    /// The run reached `Done`.
    pub fn is_success(&self) -> bool {
        self.state == CrawlState::Done
    }

    fn fail(&mut self, error: AppError) {
        log::error!("Crawl failed: {}", error);
        self.state = CrawlState::Failed;
        self.error = Some(error.to_string());
    }
}

/// Paging parameters for one run.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub forum: String,
    pub page_size: usize,
    pub total_posts: usize,
    pub request_delay_ms: u64,
}

impl From<&FeedConfig> for CrawlSettings {
    fn from(config: &FeedConfig) -> Self {
        Self {
            forum: config.forum.clone(),
            page_size: config.page_size,
            total_posts: config.total_posts,
            request_delay_ms: config.request_delay_ms,
        }
    }
}

impl CrawlSettings {
    pub fn with_forum(mut self, forum: Option<String>) -> Self {
        if let Some(forum) = forum {
            self.forum = forum;
        }
        self
    }

    pub fn with_total_posts(mut self, total_posts: Option<usize>) -> Self {
        if let Some(total_posts) = total_posts {
            self.total_posts = total_posts;
        }
        self
    }
}

/// Walks the feed and forwards each post to the store.
pub struct PostCrawler<'a> {
    settings: CrawlSettings,
    bootstrapper: &'a dyn SessionBootstrapper,
    transport: &'a dyn FeedTransport,
    store: &'a dyn PostStore,
}

impl<'a> PostCrawler<'a> {
    pub fn new(
        settings: CrawlSettings,
        bootstrapper: &'a dyn SessionBootstrapper,
        transport: &'a dyn FeedTransport,
        store: &'a dyn PostStore,
    ) -> Self {
        Self {
            settings,
            bootstrapper,
            transport,
            store,
        }
    }

    /// Run the crawl to completion. The bootstrapper is released exactly once.
    pub async fn run(&self) -> CrawlReport {
        let mut report = CrawlReport::new();

        match self.bootstrapper.bootstrap().await {
            Ok(session) => {
                report.state = CrawlState::Paging;
                self.page_all(&session, &mut report).await;
            }
            Err(error) => report.fail(error),
        }

        self.bootstrapper.release().await;
        report
    }

    async fn page_all(&self, session: &Session, report: &mut CrawlReport) {
        let budget = self.settings.total_posts;
        let page_size = self.settings.page_size.max(1);
        let mut cursor: Option<String> = None;

        log::info!(
            "Crawling forum '{}' (budget {}, page size {})",
            self.settings.forum,
            budget,
            page_size
        );

        loop {
            let remaining = budget.saturating_sub(report.posts_processed);
            if remaining == 0 {
                report.state = CrawlState::Done;
                return;
            }

            if !session.is_valid() {
                report.fail(AppError::bootstrap("session expired during crawl"));
                return;
            }

            let limit = page_size.min(remaining);
            let page = match self
                .transport
                .fetch_page(session, &self.settings.forum, cursor.as_deref(), limit)
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    report.fail(error);
                    return;
                }
            };
            report.pages_fetched += 1;

            if page.is_empty() {
                log::info!("Feed exhausted after {} page(s)", report.pages_fetched);
                report.state = CrawlState::Done;
                return;
            }

            log::info!(
                "Page {}: {} post(s) before {}",
                report.pages_fetched,
                page.len(),
                cursor.as_deref().unwrap_or("latest")
            );

            for summary in &page {
                if report.posts_processed >= budget {
                    break;
                }
                self.process_post(session, &summary.id, report).await;
                pause(self.settings.request_delay_ms).await;
            }

            cursor = page.last().map(|summary| summary.id.clone());
            report.last_cursor = cursor.clone();

            if report.posts_processed >= budget {
                report.state = CrawlState::Done;
                return;
            }

            pause(self.settings.request_delay_ms).await;
        }
    }

    async fn process_post(&self, session: &Session, id: &str, report: &mut CrawlReport) {
        let detail = match self.transport.fetch_post(session, id).await {
            Ok(detail) => detail,
            Err(error) => {
                report.fetch_failures += 1;
                log::warn!("Skipping post {}: {}", id, error);
                return;
            }
        };
        report.posts_processed += 1;

        let post_date = normalize_post_date(&detail.created_at);
        match self
            .store
            .insert(&detail.title, detail.content.as_deref(), &post_date)
        {
            InsertOutcome::Inserted => report.inserted += 1,
            InsertOutcome::DuplicateSkipped => report.duplicates += 1,
            InsertOutcome::Failed(_) => report.store_failures += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::error::Result;
    use crate::models::{PostDetail, PostSummary};
    use crate::storage::SqliteStore;

    struct FakeBootstrapper {
        fail: bool,
        expired: bool,
        releases: AtomicUsize,
    }

    impl FakeBootstrapper {
        fn ok() -> Self {
            Self {
                fail: false,
                expired: false,
                releases: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }

        fn expired() -> Self {
            Self {
                expired: true,
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl SessionBootstrapper for FakeBootstrapper {
        async fn bootstrap(&self) -> Result<Session> {
            if self.fail {
                return Err(AppError::bootstrap("challenge page"));
            }
            let session = Session::new(vec![("cf".into(), "ok".into())], Vec::new());
            if self.expired {
                return Ok(session.with_expiry(Some(Utc::now() - Duration::seconds(1))));
            }
            Ok(session)
        }

        async fn release(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Feed of ids counting down from `newest`; posts titled by id.
    struct FakeFeed {
        newest: u64,
        page_calls: Mutex<Vec<(Option<String>, usize)>>,
        post_calls: Mutex<Vec<Instant>>,
        broken_posts: HashSet<String>,
        bodiless_posts: HashSet<String>,
        fail_page: Option<usize>,
        repeat_title: bool,
    }

    impl FakeFeed {
        fn new(newest: u64) -> Self {
            Self {
                newest,
                page_calls: Mutex::new(Vec::new()),
                post_calls: Mutex::new(Vec::new()),
                broken_posts: HashSet::new(),
                bodiless_posts: HashSet::new(),
                fail_page: None,
                repeat_title: false,
            }
        }

        fn calls(&self) -> Vec<(Option<String>, usize)> {
            self.page_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeedTransport for FakeFeed {
        async fn fetch_page(
            &self,
            _session: &Session,
            _forum: &str,
            before: Option<&str>,
            limit: usize,
        ) -> Result<Vec<PostSummary>> {
            let mut calls = self.page_calls.lock().unwrap();
            calls.push((before.map(str::to_string), limit));
            if self.fail_page == Some(calls.len()) {
                return Err(AppError::transport("page", "HTTP 503"));
            }

            let start = before.map_or(self.newest, |b| b.parse::<u64>().unwrap() - 1);
            Ok((0..limit as u64)
                .filter_map(|offset| start.checked_sub(offset))
                .filter(|id| *id > 0)
                .map(|id| PostSummary { id: id.to_string() })
                .collect())
        }

        async fn fetch_post(&self, _session: &Session, id: &str) -> Result<PostDetail> {
            self.post_calls.lock().unwrap().push(Instant::now());
            if self.broken_posts.contains(id) {
                return Err(AppError::transport(id, "HTTP 404"));
            }
            let title = if self.repeat_title {
                "same title".to_string()
            } else {
                format!("post {id}")
            };
            Ok(PostDetail {
                title,
                content: (!self.bodiless_posts.contains(id)).then(|| format!("content of {id}")),
                created_at: "2023-05-28T12:34:56Z".to_string(),
            })
        }
    }

    fn settings(page_size: usize, total_posts: usize) -> CrawlSettings {
        CrawlSettings {
            forum: "house".to_string(),
            page_size,
            total_posts,
            request_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn budget_bounds_page_requests() {
        let bootstrapper = FakeBootstrapper::ok();
        let feed = FakeFeed::new(100);
        let store = SqliteStore::open_in_memory().unwrap();

        let report = PostCrawler::new(settings(2, 5), &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.state, CrawlState::Done);
        assert!(report.is_success());
        assert_eq!(
            feed.calls(),
            vec![
                (None, 2),
                (Some("99".to_string()), 2),
                (Some("97".to_string()), 1),
            ]
        );
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(report.posts_processed, 5);
        assert_eq!(report.inserted, 5);
        assert_eq!(report.last_cursor.as_deref(), Some("96"));
        assert_eq!(bootstrapper.releases.load(Ordering::SeqCst), 1);

        let records = store.list_all();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].title, "post 100");
        assert_eq!(records[0].post_date, "2023-05-28 12:34:56");
    }

    #[tokio::test]
    async fn empty_page_ends_run() {
        let bootstrapper = FakeBootstrapper::ok();
        let feed = FakeFeed::new(3);
        let store = SqliteStore::open_in_memory().unwrap();

        let report = PostCrawler::new(settings(2, 10), &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.state, CrawlState::Done);
        assert_eq!(report.posts_processed, 3);
        // [3,2], [1], []
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(bootstrapper.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bootstrap_failure_fetches_nothing() {
        let bootstrapper = FakeBootstrapper::failing();
        let feed = FakeFeed::new(100);
        let store = SqliteStore::open_in_memory().unwrap();

        let report = PostCrawler::new(settings(2, 5), &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.state, CrawlState::Failed);
        assert!(report.error.as_deref().unwrap().contains("challenge page"));
        assert!(feed.calls().is_empty());
        assert_eq!(bootstrapper.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_session_stops_before_paging() {
        let bootstrapper = FakeBootstrapper::expired();
        let feed = FakeFeed::new(100);
        let store = SqliteStore::open_in_memory().unwrap();

        let report = PostCrawler::new(settings(2, 5), &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.state, CrawlState::Failed);
        assert!(feed.calls().is_empty());
        assert_eq!(bootstrapper.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_post_fetch_is_skipped_and_not_counted() {
        let bootstrapper = FakeBootstrapper::ok();
        let mut feed = FakeFeed::new(100);
        feed.broken_posts.insert("99".to_string());
        let store = SqliteStore::open_in_memory().unwrap();

        let report = PostCrawler::new(settings(2, 3), &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.state, CrawlState::Done);
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.posts_processed, 3);
        let titles: Vec<_> = store.list_all().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["post 100", "post 98", "post 97"]);
        assert_eq!(feed.calls(), vec![(None, 2), (Some("99".to_string()), 2)]);
    }

    #[tokio::test]
    async fn failed_post_fetches_are_still_spaced_out() {
        let bootstrapper = FakeBootstrapper::ok();
        let mut feed = FakeFeed::new(3);
        for id in ["3", "2", "1"] {
            feed.broken_posts.insert(id.to_string());
        }
        let store = SqliteStore::open_in_memory().unwrap();
        let settings = CrawlSettings {
            request_delay_ms: 20,
            ..settings(2, 10)
        };

        let report = PostCrawler::new(settings, &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.state, CrawlState::Done);
        assert_eq!(report.fetch_failures, 3);
        assert_eq!(report.posts_processed, 0);

        let fetched_at = feed.post_calls.lock().unwrap().clone();
        assert_eq!(fetched_at.len(), 3);
        for pair in fetched_at.windows(2) {
            assert!(pair[1].duration_since(pair[0]).as_millis() >= 20);
        }
    }

    #[tokio::test]
    async fn post_without_body_is_stored_but_not_pending() {
        let bootstrapper = FakeBootstrapper::ok();
        let mut feed = FakeFeed::new(100);
        feed.bodiless_posts.insert("99".to_string());
        let store = SqliteStore::open_in_memory().unwrap();

        let report = PostCrawler::new(settings(2, 2), &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.inserted, 2);
        assert_eq!(report.fetch_failures, 0);

        let records = store.list_all();
        assert_eq!(records[1].title, "post 99");
        assert!(records[1].content.is_none());

        let pending: Vec<_> = store.list_unenriched().into_iter().map(|p| p.title).collect();
        assert_eq!(pending, vec!["post 100"]);
    }

    #[tokio::test]
    async fn page_error_fails_run_and_releases() {
        let bootstrapper = FakeBootstrapper::ok();
        let mut feed = FakeFeed::new(100);
        feed.fail_page = Some(2);
        let store = SqliteStore::open_in_memory().unwrap();

        let report = PostCrawler::new(settings(2, 10), &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.state, CrawlState::Failed);
        assert!(!report.is_success());
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.inserted, 2);
        assert_eq!(bootstrapper.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicates_count_toward_budget() {
        let bootstrapper = FakeBootstrapper::ok();
        let mut feed = FakeFeed::new(100);
        feed.repeat_title = true;
        let store = SqliteStore::open_in_memory().unwrap();

        let report = PostCrawler::new(settings(2, 4), &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.state, CrawlState::Done);
        assert_eq!(report.posts_processed, 4);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 3);
        assert_eq!(store.list_all().len(), 1);
    }

    #[tokio::test]
    async fn zero_budget_is_done_immediately() {
        let bootstrapper = FakeBootstrapper::ok();
        let feed = FakeFeed::new(100);
        let store = SqliteStore::open_in_memory().unwrap();

        let report = PostCrawler::new(settings(2, 0), &bootstrapper, &feed, &store)
            .run()
            .await;

        assert_eq!(report.state, CrawlState::Done);
        assert!(feed.calls().is_empty());
    }

    #[test]
    fn settings_overrides() {
        let settings = CrawlSettings::from(&FeedConfig::default())
            .with_forum(Some("mortgage".to_string()))
            .with_total_posts(None);
        assert_eq!(settings.forum, "mortgage");
        assert_eq!(settings.total_posts, 1000);
    }
}

// src/services/enricher.rs

//! Enrichment of stored posts with a classifier verdict.

use serde::Serialize;

use crate::models::{Config, PendingPost};
use crate::services::classifier::Classifier;
use crate::services::extract::{DEFAULT_SYSTEM_PROMPT, build_user_text, parse_reply};
use crate::storage::PostStore;
use crate::utils::{pause, truncate_graphemes};

/// Parameters for one enrichment batch.
#[derive(Debug, Clone)]
pub struct EnrichSettings {
    pub system_prompt: String,
    pub request_delay_ms: u64,
    /// 0 = send content untruncated
    pub max_content_chars: usize,
    /// Cap on records considered in this run
    pub limit: Option<usize>,
}

impl EnrichSettings {
    pub fn from_config(config: &Config, limit: Option<usize>) -> Self {
        Self {
            system_prompt: config
                .llm
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            request_delay_ms: config.enrich.request_delay_ms,
            max_content_chars: config.enrich.max_content_chars,
            limit,
        }
    }
}

/// Summary of an enrichment batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    pub candidates: usize,
    pub enriched: usize,
    pub skipped_empty: usize,
    pub classify_failures: usize,
    pub parse_failures: usize,
    pub store_failures: usize,
}

impl EnrichReport {
    /// At least one record was enriched in this batch.
    pub fn any_enriched(&self) -> bool {
        self.enriched > 0
    }

    /// Nothing was pending, or at least one record was enriched.
    pub fn is_success(&self) -> bool {
        self.candidates == 0 || self.any_enriched()
    }

    fn failures(&self) -> usize {
        self.classify_failures + self.parse_failures + self.store_failures
    }
}

/// Classifies unenriched posts and writes the results back.
pub struct Enricher<'a> {
    settings: EnrichSettings,
    classifier: &'a dyn Classifier,
    store: &'a dyn PostStore,
}

impl<'a> Enricher<'a> {
    pub fn new(
        settings: EnrichSettings,
        classifier: &'a dyn Classifier,
        store: &'a dyn PostStore,
    ) -> Self {
        Self {
            settings,
            classifier,
            store,
        }
    }

    /// Process every pending record once. No single record aborts the batch.
    pub async fn run(&self) -> EnrichReport {
        let pending = self.store.list_unenriched_limit(self.settings.limit);
        let mut report = EnrichReport {
            candidates: pending.len(),
            ..EnrichReport::default()
        };

        if pending.is_empty() {
            log::info!("No posts awaiting enrichment");
            return report;
        }
        log::info!("Enriching {} post(s)", pending.len());

        let mut called = false;
        for post in &pending {
            if post.content.trim().is_empty() {
                report.skipped_empty += 1;
                log::warn!("Skipping post {} ({}): empty content", post.id, post.title);
                continue;
            }

            if called {
                pause(self.settings.request_delay_ms).await;
            }
            called = true;

            self.enrich_one(post, &mut report).await;
        }

        log::info!(
            "Enrichment finished: {}/{} enriched, {} failed, {} skipped",
            report.enriched,
            report.candidates,
            report.failures(),
            report.skipped_empty
        );
        report
    }

    async fn enrich_one(&self, post: &PendingPost, report: &mut EnrichReport) {
        let content = truncate_graphemes(&post.content, self.settings.max_content_chars);
        let user_text = build_user_text(&post.title, content);

        let reply = match self
            .classifier
            .classify(&self.settings.system_prompt, &user_text)
            .await
        {
            Ok(reply) => reply,
            Err(error) => {
                report.classify_failures += 1;
                log::warn!("Classifier failed for post {}: {}", post.id, error);
                return;
            }
        };

        let extraction = match parse_reply(&reply) {
            Ok(extraction) => extraction,
            Err(failure) => {
                report.parse_failures += 1;
                log::warn!("Post {} left unenriched: {}", post.id, failure);
                return;
            }
        };

        if !extraction.gaps.is_empty() {
            log::debug!(
                "Post {} reply missing {:?}; defaults used",
                post.id,
                extraction.gaps
            );
        }

        let fields = match serde_json::to_string(&extraction.structured_fields) {
            Ok(fields) => fields,
            Err(error) => {
                report.store_failures += 1;
                log::error!("Could not serialize fields for post {}: {}", post.id, error);
                return;
            }
        };

        if self
            .store
            .apply_enrichment(post.id, extraction.relevance_score, &fields)
        {
            report.enriched += 1;
            log::info!(
                "Post {} scored {}: {}",
                post.id,
                extraction.relevance_score,
                post.title
            );
        } else {
            report.store_failures += 1;
            log::warn!("Post {} was not updated", post.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AppError, Result};
    use crate::storage::SqliteStore;

    /// Replays canned replies; `None` is a classifier error.
    struct ScriptedClassifier {
        replies: Mutex<VecDeque<Option<String>>>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedClassifier {
        fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, system: &str, user: &str) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .flatten()
                .ok_or_else(|| AppError::classifier("HTTP 500"))
        }
    }

    fn settings() -> EnrichSettings {
        EnrichSettings {
            system_prompt: "rate it".to_string(),
            request_delay_ms: 0,
            max_content_chars: 0,
            limit: None,
        }
    }

    fn store_with(posts: &[(&str, &str)]) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        for (title, content) in posts {
            store.insert(title, Some(*content), "2023-05-28 12:34:56");
        }
        store
    }

    #[tokio::test]
    async fn enriches_records_and_leaves_parse_failures() {
        let store = store_with(&[("a", "房貸 500萬"), ("b", "天氣很好")]);
        let classifier = ScriptedClassifier::new(vec![
            Some(r#"Sure! {"relevance_score": 85, "structured_data": {"amount":"500萬"}} Thanks."#),
            Some("I cannot answer that."),
        ]);

        let report = Enricher::new(settings(), &classifier, &store).run().await;

        assert_eq!(report.candidates, 2);
        assert_eq!(report.enriched, 1);
        assert_eq!(report.parse_failures, 1);
        assert!(report.any_enriched());

        let records = store.list_all();
        assert_eq!(records[0].relevance_score, Some(85));
        assert_eq!(
            records[0].structured_fields.as_deref(),
            Some(r#"{"amount":"500萬"}"#)
        );
        assert!(records[0].enriched_at.is_some());

        assert_eq!(records[1].relevance_score, None);
        assert_eq!(records[1].structured_fields, None);
        assert_eq!(records[1].enriched_at, None);

        let pending = store.list_unenriched();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "b");
    }

    #[tokio::test]
    async fn nothing_to_do_reports_false() {
        let store = SqliteStore::open_in_memory().unwrap();
        let classifier = ScriptedClassifier::new(vec![]);

        let report = Enricher::new(settings(), &classifier, &store).run().await;

        assert_eq!(report, EnrichReport::default());
        assert!(!report.any_enriched());
        assert!(report.is_success());
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn classifier_error_does_not_abort_batch() {
        let store = store_with(&[("a", "x"), ("b", "y")]);
        let classifier = ScriptedClassifier::new(vec![
            None,
            Some(r#"{"relevance_score": 10, "structured_data": {}}"#),
        ]);

        let report = Enricher::new(settings(), &classifier, &store).run().await;

        assert_eq!(report.classify_failures, 1);
        assert_eq!(report.enriched, 1);
        assert_eq!(store.list_unenriched()[0].title, "a");
    }

    #[tokio::test]
    async fn missing_keys_enrich_with_defaults() {
        let store = store_with(&[("a", "x")]);
        let classifier = ScriptedClassifier::new(vec![Some(r#"{"summary": "n/a"}"#)]);

        let report = Enricher::new(settings(), &classifier, &store).run().await;

        assert_eq!(report.enriched, 1);
        let record = &store.list_all()[0];
        assert_eq!(record.relevance_score, Some(0));
        assert_eq!(record.structured_fields.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn blank_content_is_skipped_without_classifier_call() {
        let store = store_with(&[("blank", "   \n"), ("empty", "")]);
        let classifier = ScriptedClassifier::new(vec![]);

        let report = Enricher::new(settings(), &classifier, &store).run().await;

        assert_eq!(report.candidates, 1);
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(classifier.calls(), 0);
        assert!(!report.any_enriched());
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn prompt_and_truncated_content_reach_classifier() {
        let store = store_with(&[("利率", "房貸利率很高")]);
        let classifier = ScriptedClassifier::new(vec![Some(
            r#"{"relevance_score": 90, "structured_data": {}}"#,
        )]);
        let settings = EnrichSettings {
            max_content_chars: 4,
            ..settings()
        };

        Enricher::new(settings, &classifier, &store).run().await;

        let seen = classifier.seen.lock().unwrap();
        assert_eq!(seen[0].0, "rate it");
        assert_eq!(seen[0].1, "Title: 利率\n\nContent: 房貸利率");
    }

    #[tokio::test]
    async fn limit_caps_candidates() {
        let store = store_with(&[("a", "x"), ("b", "y"), ("c", "z")]);
        let classifier = ScriptedClassifier::new(vec![
            Some(r#"{"relevance_score": 1}"#),
            Some(r#"{"relevance_score": 2}"#),
        ]);
        let settings = EnrichSettings {
            limit: Some(2),
            ..settings()
        };

        let report = Enricher::new(settings, &classifier, &store).run().await;

        assert_eq!(report.candidates, 2);
        assert_eq!(report.enriched, 2);
        assert_eq!(store.list_unenriched().len(), 1);
    }

    #[tokio::test]
    async fn second_run_does_not_reprocess() {
        let store = store_with(&[("a", "x")]);
        let classifier = ScriptedClassifier::new(vec![Some(
            r#"{"relevance_score": 40, "structured_data": {}}"#,
        )]);

        let first = Enricher::new(settings(), &classifier, &store).run().await;
        let second = Enricher::new(settings(), &classifier, &store).run().await;

        assert!(first.any_enriched());
        assert!(!second.any_enriched());
        assert_eq!(classifier.calls(), 1);
    }

    #[test]
    fn settings_default_to_builtin_prompt() {
        let settings = EnrichSettings::from_config(&Config::default(), Some(5));
        assert_eq!(settings.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(settings.max_content_chars, 8000);
        assert_eq!(settings.limit, Some(5));
    }
}

//! Discovery paginator
//!
//! Walks the activity feed page by page, strictly sequentially: the
//! continuation signal (an empty page) is only known after the previous page
//! is fetched. Emits the accumulated [`ImageRecord`]s as a durable index
//! file; the download coordinator never starts before that file is on disk.

use std::path::Path;

use crate::config::DiscoveryConfig;
use crate::error::{Error, Result};
use crate::feed::ActivityFeed;
use crate::index::Index;
use crate::retry::with_retry;
use crate::types::ImageRecord;

/// Paginated discovery of image records
///
/// Generic over the feed adapter so the remote contract stays pluggable.
pub struct DiscoveryPaginator<F> {
    feed: F,
    config: DiscoveryConfig,
}

impl<F: ActivityFeed> DiscoveryPaginator<F> {
    /// Create a paginator over a feed adapter
    pub fn new(feed: F, config: DiscoveryConfig) -> Self {
        Self { feed, config }
    }

    /// Walk the feed from `start_page` and persist the index to `index_path`
    ///
    /// Pagination stops at the first empty page (the feed is exhausted), or
    /// after collecting the configured `end_page` (inclusive). Each page is
    /// retried within the configured bounds before the run is halted.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] when the session is rejected: the run aborts
    ///   immediately and no index is written.
    /// - [`Error::Discovery`] when a page keeps failing after retries: the
    ///   partial index up to the last successful page is persisted first, so
    ///   the failed run never has to be re-discovered from scratch.
    pub async fn run(&self, index_path: &Path) -> Result<Index> {
        let mut records: Vec<ImageRecord> = Vec::new();
        let mut page = self.config.start_page;

        loop {
            tracing::info!(page, "fetching activity page");

            let entries =
                match with_retry(&self.config.retry, || self.feed.fetch_page(page)).await {
                    Ok(entries) => entries,
                    Err(err @ Error::Auth { .. }) => return Err(err),
                    Err(e) => {
                        let partial = Index::new(records);
                        partial.save(index_path).await?;
                        tracing::warn!(
                            page,
                            persisted = partial.len(),
                            "pagination halted, partial index persisted"
                        );
                        return Err(Error::Discovery {
                            page,
                            reason: e.to_string(),
                        });
                    }
                };

            if entries.is_empty() {
                tracing::info!(page, "page had no images, feed exhausted");
                break;
            }

            tracing::info!(page, images = entries.len(), "page discovered");
            records.extend(entries.into_iter().map(|entry| ImageRecord {
                id: entry.id,
                url: entry.url,
                captured_at: entry.captured_at,
                page_number: page,
                file_name: entry.file_name,
            }));

            if self.config.end_page == Some(page) {
                tracing::info!(page, "reached configured end page");
                break;
            }
            page += 1;
        }

        let index = Index::new(records);
        index.save(index_path).await?;
        tracing::info!(
            records = index.len(),
            path = %index_path.display(),
            "discovery complete"
        );
        Ok(index)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ActivityEntry;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted feed: one response per page, `None` simulates a transient
    /// failure, pages past the script are empty.
    struct ScriptedFeed {
        pages: Mutex<Vec<Option<Vec<ActivityEntry>>>>,
        fetches: AtomicU32,
        auth_fail_from: Option<u32>,
    }

    impl ScriptedFeed {
        fn new(pages: Vec<Option<Vec<ActivityEntry>>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                fetches: AtomicU32::new(0),
                auth_fail_from: None,
            }
        }

        fn fetch_count(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ActivityFeed for &ScriptedFeed {
        async fn fetch_page(&self, page: u32) -> crate::error::Result<Vec<ActivityEntry>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(from) = self.auth_fail_from
                && page >= from
            {
                return Err(Error::Auth {
                    account: "acct".into(),
                });
            }
            let pages = self.pages.lock().unwrap();
            match pages.get((page - 1) as usize) {
                Some(Some(entries)) => Ok(entries.clone()),
                Some(None) => Err(Error::FeedStatus { page, status: 502 }),
                None => Ok(Vec::new()),
            }
        }
    }

    fn entry(n: u32) -> ActivityEntry {
        ActivityEntry {
            id: format!("img-{n}.jpg"),
            url: format!("https://m.example.com/img-{n}.jpg?sig=a"),
            captured_at: NaiveDate::from_ymd_opt(2023, 1, n).unwrap(),
            file_name: format!("img-{n}.jpg"),
        }
    }

    fn config() -> DiscoveryConfig {
        DiscoveryConfig {
            retry: crate::config::RetryConfig {
                max_attempts: 1,
                initial_delay: std::time::Duration::from_millis(1),
                jitter: false,
                ..Default::default()
            },
            ..DiscoveryConfig::new("acct", "token")
        }
    }

    #[tokio::test]
    async fn paginates_until_the_first_empty_page() {
        let feed = ScriptedFeed::new(vec![
            Some(vec![entry(1), entry(2)]),
            Some(vec![entry(3)]),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = DiscoveryPaginator::new(&feed, config()).run(&path).await.unwrap();

        assert_eq!(index.len(), 3);
        // Two content pages plus the empty page that signalled the end
        assert_eq!(feed.fetch_count(), 3);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn records_remember_their_discovery_page() {
        let feed = ScriptedFeed::new(vec![
            Some(vec![entry(1)]),
            Some(vec![entry(2), entry(3)]),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = DiscoveryPaginator::new(&feed, config()).run(&path).await.unwrap();

        assert_eq!(index.records[0].page_number, 1);
        assert_eq!(index.records[1].page_number, 2);
        assert_eq!(index.records[2].page_number, 2);
    }

    #[tokio::test]
    async fn end_page_is_inclusive_and_stops_pagination() {
        let feed = ScriptedFeed::new(vec![
            Some(vec![entry(1)]),
            Some(vec![entry(2)]),
            Some(vec![entry(3)]),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut config = config();
        config.end_page = Some(2);
        let index = DiscoveryPaginator::new(&feed, config).run(&path).await.unwrap();

        // Pages 1 and 2 collected, page 3 never fetched
        assert_eq!(index.len(), 2);
        assert_eq!(feed.fetch_count(), 2);
    }

    #[tokio::test]
    async fn end_page_equal_to_start_page_fetches_exactly_one_page() {
        let feed = ScriptedFeed::new(vec![
            Some(vec![entry(1), entry(2)]),
            Some(vec![entry(3)]),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut config = config();
        config.end_page = Some(1);
        let index = DiscoveryPaginator::new(&feed, config).run(&path).await.unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(feed.fetch_count(), 1);
    }

    #[tokio::test]
    async fn start_page_offsets_the_walk() {
        let feed = ScriptedFeed::new(vec![
            Some(vec![entry(1)]),
            Some(vec![entry(2)]),
            Some(vec![entry(3)]),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut config = config();
        config.start_page = 3;
        let index = DiscoveryPaginator::new(&feed, config).run(&path).await.unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.records[0].id, "img-3.jpg");
        assert_eq!(index.records[0].page_number, 3);
    }

    #[tokio::test]
    async fn auth_failure_aborts_without_writing_an_index() {
        let mut feed = ScriptedFeed::new(vec![Some(vec![entry(1)])]);
        feed.auth_fail_from = Some(1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let err = DiscoveryPaginator::new(&feed, config()).run(&path).await.unwrap_err();

        assert!(matches!(err, Error::Auth { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn mid_run_auth_failure_also_leaves_no_index() {
        let mut feed = ScriptedFeed::new(vec![Some(vec![entry(1)]), Some(vec![entry(2)])]);
        feed.auth_fail_from = Some(2);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let err = DiscoveryPaginator::new(&feed, config()).run(&path).await.unwrap_err();

        assert!(matches!(err, Error::Auth { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn transient_failure_persists_the_partial_index() {
        let feed = ScriptedFeed::new(vec![
            Some(vec![entry(1), entry(2)]),
            None, // page 2 keeps failing
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let err = DiscoveryPaginator::new(&feed, config()).run(&path).await.unwrap_err();

        assert!(matches!(err, Error::Discovery { page: 2, .. }));
        let partial = Index::load(&path).await.unwrap();
        assert_eq!(partial.len(), 2);
        assert!(partial.records.iter().all(|r| r.page_number == 1));
    }

    #[tokio::test]
    async fn transient_pages_are_retried_before_halting() {
        let feed = ScriptedFeed::new(vec![None]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut config = config();
        config.retry.max_attempts = 2;
        let err = DiscoveryPaginator::new(&feed, config).run(&path).await.unwrap_err();

        assert!(matches!(err, Error::Discovery { page: 1, .. }));
        // Initial attempt plus two retries
        assert_eq!(feed.fetch_count(), 3);
    }

    #[tokio::test]
    async fn an_empty_feed_writes_an_empty_index() {
        let feed = ScriptedFeed::new(vec![]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = DiscoveryPaginator::new(&feed, config()).run(&path).await.unwrap();

        assert!(index.is_empty());
        assert!(Index::load(&path).await.unwrap().is_empty());
    }
}

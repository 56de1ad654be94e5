//! Download coordinator
//!
//! Reads the index produced by discovery and fetches every record's signed
//! URL with bounded parallelism. Failures are isolated per record: a dead
//! URL (expired signature, network trouble, unwritable path) is reported in
//! the summary and never aborts sibling downloads.
//!
//! Every record is attempted exactly once per run. Destination files are
//! unconditionally overwritten, which makes re-running against the same
//! index idempotent on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Result};
use crate::index::Index;
use crate::types::{DownloadOutcome, DownloadSummary, ImageRecord};

/// Bounded-parallel downloader over an index of image records
pub struct DownloadCoordinator {
    client: reqwest::Client,
    config: DownloadConfig,
}

impl DownloadCoordinator {
    /// Create a coordinator from a validated download configuration
    ///
    /// # Errors
    ///
    /// Returns a config error for an invalid worker count, or a network
    /// error when the HTTP client cannot be created.
    pub fn new(config: DownloadConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("journal-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// Attempt every record in the index once
    pub async fn run(&self, index: &Index) -> DownloadSummary {
        self.run_with_observer(index, |_| {}).await
    }

    /// Attempt every record in the index once, invoking `observe` as each
    /// attempt completes (in completion order, from the coordinating task)
    ///
    /// At most `workers` downloads are in flight at any instant; permits are
    /// acquired before each worker task is spawned, so the task set itself
    /// stays bounded.
    pub async fn run_with_observer<F>(&self, index: &Index, mut observe: F) -> DownloadSummary
    where
        F: FnMut(&DownloadOutcome),
    {
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut tasks = JoinSet::new();
        let mut summary = DownloadSummary::default();

        tracing::info!(
            records = index.len(),
            workers = self.config.workers,
            flatten = self.config.flatten,
            output_dir = %self.config.output_dir.display(),
            "starting downloads"
        );

        for record in index.records.iter().cloned() {
            // Drain finished workers while waiting on a permit so outcomes
            // surface as they complete rather than all at the end.
            while let Some(joined) = tasks.try_join_next() {
                Self::collect(joined, &mut observe, &mut summary);
            }

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };

            let client = self.client.clone();
            let output_dir = self.config.output_dir.clone();
            let flatten = self.config.flatten;
            tasks.spawn(async move {
                let _permit = permit;
                let result = download_record(&client, &record, &output_dir, flatten).await;
                DownloadOutcome { record, result }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            Self::collect(joined, &mut observe, &mut summary);
        }

        tracing::info!(
            attempted = summary.attempted(),
            succeeded = summary.succeeded(),
            failed = summary.failures().count(),
            "downloads finished"
        );
        summary
    }

    fn collect<F>(
        joined: std::result::Result<DownloadOutcome, tokio::task::JoinError>,
        observe: &mut F,
        summary: &mut DownloadSummary,
    ) where
        F: FnMut(&DownloadOutcome),
    {
        match joined {
            Ok(outcome) => {
                match &outcome.result {
                    Ok(path) => {
                        tracing::debug!(id = %outcome.record.id, path = %path.display(), "image written")
                    }
                    Err(e) => {
                        tracing::warn!(id = %outcome.record.id, error = %e, "image download failed")
                    }
                }
                observe(&outcome);
                summary.outcomes.push(outcome);
            }
            Err(e) => tracing::error!(error = %e, "download worker panicked"),
        }
    }
}

/// Fetch one record's signed URL and write it under the output root
///
/// Intermediate directories are created as needed and an existing file at
/// the destination is overwritten. On success the file's modification time
/// is stamped with the record's capture date.
async fn download_record(
    client: &reqwest::Client,
    record: &ImageRecord,
    output_dir: &Path,
    flatten: bool,
) -> std::result::Result<PathBuf, DownloadError> {
    let response = client
        .get(&record.url)
        .send()
        .await
        .map_err(|e| DownloadError::Request {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            id: record.id.clone(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(|e| DownloadError::Request {
        id: record.id.clone(),
        reason: e.to_string(),
    })?;

    let dest = output_dir.join(record.relative_path(flatten));
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::Write {
                path: dest.clone(),
                reason: e.to_string(),
            })?;
    }
    tokio::fs::write(&dest, &bytes)
        .await
        .map_err(|e| DownloadError::Write {
            path: dest.clone(),
            reason: e.to_string(),
        })?;

    if let Err(e) = crate::utils::set_capture_mtime(&dest, record.captured_at) {
        tracing::warn!(path = %dest.display(), error = %e, "could not stamp capture date");
    }

    Ok(dest)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(server_uri: &str, n: u32) -> ImageRecord {
        ImageRecord {
            id: format!("img-{n}.jpg"),
            url: format!("{server_uri}/objects/img-{n}.jpg?sig=abc"),
            captured_at: NaiveDate::from_ymd_opt(2023, 1, n).unwrap(),
            page_number: 1,
            file_name: format!("img-{n}.jpg"),
        }
    }

    fn coordinator(output_dir: PathBuf, flatten: bool) -> DownloadCoordinator {
        DownloadCoordinator::new(DownloadConfig {
            output_dir,
            flatten,
            workers: 4,
            ..Default::default()
        })
        .unwrap()
    }

    async fn mount_image(server: &MockServer, n: u32, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/objects/img-{n}.jpg")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn downloads_every_record_to_the_hierarchy() {
        let server = MockServer::start().await;
        mount_image(&server, 1, b"one").await;
        mount_image(&server, 2, b"two").await;

        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(vec![record(&server.uri(), 1), record(&server.uri(), 2)]);

        let summary = coordinator(dir.path().to_path_buf(), false).run(&index).await;

        assert_eq!(summary.attempted(), 2);
        assert!(summary.all_succeeded());
        assert_eq!(
            std::fs::read(dir.path().join("2023/01/img-1.jpg")).unwrap(),
            b"one"
        );
        assert_eq!(
            std::fs::read(dir.path().join("2023/01/img-2.jpg")).unwrap(),
            b"two"
        );
    }

    #[tokio::test]
    async fn flatten_puts_every_file_in_the_output_root() {
        let server = MockServer::start().await;
        mount_image(&server, 1, b"one").await;

        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(vec![record(&server.uri(), 1)]);

        let summary = coordinator(dir.path().to_path_buf(), true).run(&index).await;

        assert!(summary.all_succeeded());
        assert!(dir.path().join("img-1.jpg").exists());
        assert!(!dir.path().join("2023").exists());
    }

    #[tokio::test]
    async fn an_expired_url_fails_alone() {
        let server = MockServer::start().await;
        mount_image(&server, 1, b"one").await;
        Mock::given(method("GET"))
            .and(path("/objects/img-2.jpg"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        mount_image(&server, 3, b"three").await;

        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(vec![
            record(&server.uri(), 1),
            record(&server.uri(), 2),
            record(&server.uri(), 3),
        ]);

        let summary = coordinator(dir.path().to_path_buf(), false).run(&index).await;

        assert_eq!(summary.attempted(), 3);
        assert_eq!(summary.succeeded(), 2);
        let failure = summary.failures().next().unwrap();
        assert_eq!(failure.record.id, "img-2.jpg");
        match &failure.result {
            Err(e) => assert!(e.is_authorization()),
            Ok(_) => panic!("expected a failed outcome"),
        }
    }

    #[tokio::test]
    async fn rerunning_overwrites_existing_files() {
        let server = MockServer::start().await;
        mount_image(&server, 1, b"fresh bytes").await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("2023/01/img-1.jpg");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"stale").unwrap();

        let index = Index::new(vec![record(&server.uri(), 1)]);
        let coordinator = coordinator(dir.path().to_path_buf(), false);

        let first = coordinator.run(&index).await;
        assert!(first.all_succeeded());
        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh bytes");

        let second = coordinator.run(&index).await;
        assert!(second.all_succeeded());
        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh bytes");
    }

    #[tokio::test]
    async fn written_files_carry_the_capture_date() {
        let server = MockServer::start().await;
        mount_image(&server, 1, b"one").await;

        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(vec![record(&server.uri(), 1)]);

        coordinator(dir.path().to_path_buf(), true).run(&index).await;

        let modified = std::fs::metadata(dir.path().join("img-1.jpg"))
            .unwrap()
            .modified()
            .unwrap();
        let expected = std::time::SystemTime::UNIX_EPOCH
            + std::time::Duration::from_secs(
                NaiveDate::from_ymd_opt(2023, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    .and_utc()
                    .timestamp() as u64,
            );
        assert_eq!(modified, expected);
    }

    #[tokio::test]
    async fn observer_sees_every_outcome() {
        let server = MockServer::start().await;
        mount_image(&server, 1, b"one").await;
        Mock::given(method("GET"))
            .and(path("/objects/img-2.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(vec![record(&server.uri(), 1), record(&server.uri(), 2)]);

        let mut seen = Vec::new();
        coordinator(dir.path().to_path_buf(), true)
            .run_with_observer(&index, |outcome| seen.push(outcome.record.id.clone()))
            .await;

        seen.sort();
        assert_eq!(seen, vec!["img-1.jpg", "img-2.jpg"]);
    }

    #[tokio::test]
    async fn an_empty_index_completes_with_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let summary = coordinator(dir.path().to_path_buf(), false)
            .run(&Index::default())
            .await;
        assert_eq!(summary.attempted(), 0);
        assert!(summary.all_succeeded());
    }
}

//! Core types for journal-dl

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::DownloadError;

/// One discovered image from the activity feed
///
/// Records are created during discovery, persisted to the index file, and
/// read (never mutated) by the download coordinator. Ids are unique within a
/// single discovery run; overlapping page ranges across runs may produce
/// duplicates, and the last write for a filename wins on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Unique identifier from the remote system (the storage object key)
    pub id: String,

    /// Signed, time-limited download URL. Valid for roughly 3.5 hours from
    /// issuance; downloads attempted after that fail with an authorization
    /// error and need re-discovery.
    pub url: String,

    /// Date of the original activity, used for hierarchy placement
    pub captured_at: NaiveDate,

    /// The discovery page this record was found on. A hint for choosing
    /// `--start-page`/`--end-page` on a later run, not an automatic resume
    /// mechanism.
    pub page_number: u32,

    /// Download filename advertised by the feed
    pub file_name: String,
}

impl ImageRecord {
    /// Destination path relative to the output root
    ///
    /// With `flatten` every file lands directly in the output root under its
    /// advertised filename; otherwise files nest under `YYYY/MM/` derived
    /// from the capture date. The filename is reduced to its final component
    /// (falling back to the record id) so a hand-edited index cannot write
    /// outside the output root.
    pub fn relative_path(&self, flatten: bool) -> PathBuf {
        let name = crate::utils::sanitize_file_name(&self.file_name)
            .unwrap_or_else(|| self.id.clone());
        if flatten {
            PathBuf::from(name)
        } else {
            PathBuf::from(self.captured_at.year().to_string())
                .join(format!("{:02}", self.captured_at.month()))
                .join(name)
        }
    }
}

/// Result of one download attempt
#[derive(Clone, Debug)]
pub struct DownloadOutcome {
    /// The record that was attempted
    pub record: ImageRecord,
    /// The written path on success, or the isolated failure
    pub result: Result<PathBuf, DownloadError>,
}

impl DownloadOutcome {
    /// True when the record's file was written
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregated outcomes of a download coordinator run
///
/// Every record in the index is attempted exactly once; this summary reports
/// which attempts succeeded and which failed, with enough identity (id, url,
/// path, error) for the user to re-discover and retry manually.
#[derive(Clone, Debug, Default)]
pub struct DownloadSummary {
    /// Per-record outcomes, in completion order (no ordering guarantee
    /// between workers)
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadSummary {
    /// Total number of download attempts
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of records written successfully
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// True when every attempted record was written
    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.attempted()
    }
}

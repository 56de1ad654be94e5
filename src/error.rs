//! Error types for journal-dl
//!
//! This module provides the error handling for the crate, including:
//! - The crate-level [`Error`] type used by discovery and the CLI
//! - Per-record [`DownloadError`] values collected by the download coordinator
//! - A [`Result`] alias used throughout the library
//!
//! Discovery failures propagate and terminate the run; download failures are
//! isolated per record and aggregated into the run summary instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for journal-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for journal-dl
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Session credential rejected by the journal. Fatal for discovery:
    /// no index is written for the failed run.
    #[error("authentication rejected for account {account} (check the session cookie value)")]
    Auth {
        /// The account whose session was rejected
        account: String,
    },

    /// Pagination failed mid-run after bounded retries. The partial index up
    /// to the last successful page has already been persisted.
    #[error("discovery failed on page {page}: {reason}")]
    Discovery {
        /// The page on which pagination halted
        page: u32,
        /// Description of the underlying failure
        reason: String,
    },

    /// The activity listing endpoint returned a non-success status
    #[error("activity feed returned HTTP {status} for page {page}")]
    FeedStatus {
        /// The page that was being fetched
        page: u32,
        /// The HTTP status code returned
        status: u16,
    },

    /// The activity feed response could not be interpreted
    #[error("malformed activity feed response on page {page}: {reason}")]
    FeedParse {
        /// The page whose response failed to parse
        page: u32,
        /// Description of the parse failure
        reason: String,
    },

    /// Per-record download failure (only surfaced directly when a single
    /// record is downloaded outside the coordinator)
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },

    /// The index file does not exist (run `download` before `resume`)
    #[error("index file not found at {path}")]
    IndexNotFound {
        /// The path that was checked
        path: PathBuf,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (index file read/write)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Helper to build a configuration error
    pub fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Self::Config {
            message: message.into(),
            key: key.map(str::to_string),
        }
    }
}

/// Per-record download failures
///
/// These never abort sibling downloads; the coordinator collects them into
/// the [`DownloadSummary`](crate::types::DownloadSummary).
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// The storage backend returned a non-success status. A 403 here almost
    /// always means the signed URL expired; the record needs re-discovery,
    /// not a retry of the same index.
    #[error("image {id} returned HTTP {status}")]
    Status {
        /// The record id whose download failed
        id: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// The request could not be completed (timeout, connection failure)
    #[error("image {id} could not be fetched: {reason}")]
    Request {
        /// The record id whose download failed
        id: String,
        /// Description of the transport failure
        reason: String,
    },

    /// The response body could not be written to disk
    #[error("failed to write {path}: {reason}")]
    Write {
        /// The destination path that could not be written
        path: PathBuf,
        /// Description of the I/O failure
        reason: String,
    },
}

impl DownloadError {
    /// True when the failure is an authorization rejection from the storage
    /// backend, meaning the signed URL has expired. Terminal for the record.
    pub fn is_authorization(&self) -> bool {
        matches!(self, DownloadError::Status { status, .. } if *status == 401 || *status == 403)
    }
}

//! Configuration types for journal-dl

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Discovery configuration (account, session credential, page range)
///
/// Everything the discovery paginator needs is passed explicitly here rather
/// than read from ambient state, so a run can be reconstructed from the
/// configuration alone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Account identifier from the journal (opaque string)
    pub account_id: String,

    /// Session cookie value authenticating listing requests. Short-lived;
    /// obtained manually from the web application by the caller.
    pub session_value: String,

    /// Base URL of the journal application
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the session cookie expected by the listing endpoint
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// First page to fetch (default: 1)
    #[serde(default = "default_start_page")]
    pub start_page: u32,

    /// Last page to fetch, inclusive (None = paginate until the feed ends)
    #[serde(default)]
    pub end_page: Option<u32>,

    /// Per-request timeout for listing requests (default: 30 seconds)
    #[serde(default = "default_feed_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Page-level retry behavior for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl DiscoveryConfig {
    /// Create a discovery configuration for an account/session pair with
    /// default pagination and endpoint settings
    pub fn new(account_id: impl Into<String>, session_value: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            session_value: session_value.into(),
            base_url: default_base_url(),
            session_cookie: default_session_cookie(),
            start_page: default_start_page(),
            end_page: None,
            request_timeout: default_feed_timeout(),
            retry: RetryConfig::default(),
        }
    }

    /// Validate page bounds and credential presence
    ///
    /// # Errors
    ///
    /// Returns a config error when the account id or session value is empty,
    /// when `start_page` is zero (pages are 1-based), or when `end_page`
    /// precedes `start_page`.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.is_empty() {
            return Err(Error::config("account id must not be empty", Some("account_id")));
        }
        if self.session_value.is_empty() {
            return Err(Error::config(
                "session value must not be empty",
                Some("session_value"),
            ));
        }
        if self.start_page == 0 {
            return Err(Error::config(
                "pages are numbered from 1",
                Some("start_page"),
            ));
        }
        if let Some(end) = self.end_page
            && end < self.start_page
        {
            return Err(Error::config(
                format!("end page {} precedes start page {}", end, self.start_page),
                Some("end_page"),
            ));
        }
        Ok(())
    }
}

/// Download coordinator configuration (output layout, parallelism)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output root directory (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Number of parallel download workers (default: 10). Bounds the number
    /// of in-flight requests, not the total number of downloads.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// When true, every file lands directly in `output_dir`; when false,
    /// files are placed under year/month subdirectories derived from the
    /// record's capture date.
    #[serde(default)]
    pub flatten: bool,

    /// Per-request timeout for image downloads (default: 120 seconds).
    /// Signed URLs and sessions can expire mid-run; a stuck request should
    /// surface as a reported failure rather than a hang.
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            workers: default_workers(),
            flatten: false,
            request_timeout: default_download_timeout(),
        }
    }
}

impl DownloadConfig {
    /// Validate worker count
    ///
    /// # Errors
    ///
    /// Returns a config error when `workers` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("worker count must be at least 1", Some("workers")));
        }
        Ok(())
    }
}

/// Retry behavior for transient page-fetch failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts per page (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

fn default_base_url() -> String {
    "https://classroom.kindercare.com".to_string()
}

fn default_session_cookie() -> String {
    "_himama_session".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_feed_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_workers() -> usize {
    10
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (seconds as integer)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

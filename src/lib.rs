//! # journal-dl
//!
//! Archiver for a daycare's web journal: paginated discovery of image
//! records plus bounded-parallel download of their signed URLs. The journal
//! application offers no bulk export, so this crate walks the authenticated
//! activity feed, records every image in a durable index file, and fetches
//! the images to disk.
//!
//! ## Design
//!
//! - **Two phases, one artifact** - discovery writes the index file,
//!   the download coordinator reads it; `resume` re-downloads from an
//!   existing index without touching the feed.
//! - **Adapter boundary** - the remote contract (URL shape, auth cookie,
//!   response markup) lives behind the [`feed::ActivityFeed`] trait.
//! - **Isolated failures** - one dead signed URL never aborts the run;
//!   per-record outcomes are aggregated and reported.
//!
//! ## Quick Start
//!
//! ```no_run
//! use journal_dl::{DiscoveryConfig, DiscoveryPaginator, DownloadConfig,
//!                  DownloadCoordinator, HttpActivityFeed};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let discovery = DiscoveryConfig::new("12345", "session-cookie-value");
//!     let feed = HttpActivityFeed::new(discovery.clone())?;
//!
//!     let index = DiscoveryPaginator::new(feed, discovery)
//!         .run(Path::new("index.json"))
//!         .await?;
//!
//!     let summary = DownloadCoordinator::new(DownloadConfig::default())?
//!         .run(&index)
//!         .await;
//!     println!("{} of {} images written", summary.succeeded(), summary.attempted());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Command-line surface
pub mod cli;
/// Configuration types
pub mod config;
/// Paginated discovery of image records
pub mod discovery;
/// Bounded-parallel download coordinator
pub mod downloader;
/// Error types
pub mod error;
/// Activity feed adapter
pub mod feed;
/// Index file persistence
pub mod index;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;
/// Filename and file-metadata helpers
pub mod utils;

// Re-export commonly used types
pub use config::{DiscoveryConfig, DownloadConfig, RetryConfig};
pub use discovery::DiscoveryPaginator;
pub use downloader::DownloadCoordinator;
pub use error::{DownloadError, Error, Result};
pub use feed::{ActivityEntry, ActivityFeed, HttpActivityFeed};
pub use index::Index;
pub use types::{DownloadOutcome, DownloadSummary, ImageRecord};

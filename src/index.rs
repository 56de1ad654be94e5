//! Index file persistence
//!
//! The index is the single artifact shared by the two pipeline phases: the
//! discovery paginator writes it, the download coordinator reads it. It is a
//! JSON document carrying the date range covered plus every discovered
//! record, replaced wholesale on each discovery run. There is no per-record
//! update.

use serde::{Deserialize, Serialize};
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::types::ImageRecord;

/// The persisted index of discovered images
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Index {
    /// Earliest capture date among the records (None for an empty index)
    pub earliest: Option<NaiveDate>,

    /// Latest capture date among the records (None for an empty index)
    pub latest: Option<NaiveDate>,

    /// All discovered records, in discovery order
    pub records: Vec<ImageRecord>,
}

impl Index {
    /// Build an index from discovered records, computing the covered date
    /// range
    pub fn new(records: Vec<ImageRecord>) -> Self {
        let earliest = records.iter().map(|r| r.captured_at).min();
        let latest = records.iter().map(|r| r.captured_at).max();
        Self {
            earliest,
            latest,
            records,
        }
    }

    /// Number of records in the index
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the index holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Persist the index to `path`
    ///
    /// Writes to a sibling temp file and renames it into place so a crash
    /// mid-write never leaves a truncated index behind.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem operation fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, path).await?;

        tracing::debug!(path = %path.display(), records = self.len(), "index written");
        Ok(())
    }

    /// Load an index from `path`
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexNotFound`] when the file does not exist, or a
    /// serialization error when it cannot be parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::IndexNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

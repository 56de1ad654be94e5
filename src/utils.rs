//! Utility functions for filename handling and file metadata

use chrono::NaiveDate;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Reduce an advertised download filename to a bare file name
///
/// Feed-supplied names must never navigate outside the output directory, so
/// only the final path component survives and `.`/`..` are rejected.
///
/// # Examples
///
/// ```
/// use journal_dl::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("photo.jpg"), Some("photo.jpg".to_string()));
/// assert_eq!(sanitize_file_name("../../etc/passwd"), Some("passwd".to_string()));
/// assert_eq!(sanitize_file_name(".."), None);
/// ```
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())?
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// Stamp a downloaded file with its activity's capture date
///
/// Sets the file's modification time to midnight UTC of `date`, so archived
/// photos sort by when they were taken rather than when they were fetched.
/// Dates before the Unix epoch are left unstamped.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or its metadata cannot
/// be updated.
pub fn set_capture_mtime(path: &Path, date: NaiveDate) -> std::io::Result<()> {
    let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
        return Ok(());
    };
    let timestamp = midnight.and_utc().timestamp();
    if timestamp < 0 {
        return Ok(());
    }

    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(timestamp as u64);
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    file.set_modified(mtime)
}

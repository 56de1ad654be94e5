//! Activity feed adapter
//!
//! The journal's remote contract (URL shape, auth cookie, response markup) is
//! undocumented, so it is isolated behind the [`ActivityFeed`] trait. The
//! discovery paginator only depends on the trait; [`HttpActivityFeed`] is the
//! production adapter for the hosted journal application.
//!
//! Continuation contract: a page past the end of the feed yields an empty
//! entry list, never an error.

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header;
use url::Url;

use crate::config::DiscoveryConfig;
use crate::error::{Error, Result};

/// One image entry extracted from an activity page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityEntry {
    /// Storage object key identifying the image
    pub id: String,

    /// Signed download URL
    pub url: String,

    /// Date of the activity the image belongs to
    pub captured_at: NaiveDate,

    /// Filename advertised by the feed's download link
    pub file_name: String,
}

/// Source of paginated activity entries
///
/// Implementations must return an empty vector for pages past the end of the
/// feed; that is the paginator's only continuation signal.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Fetch one page of the activity listing (pages are 1-based)
    async fn fetch_page(&self, page: u32) -> Result<Vec<ActivityEntry>>;
}

/// HTTP adapter for the hosted journal application
///
/// Issues authenticated listing requests
/// (`GET {base_url}/accounts/{account}/activities?page={n}` with the session
/// cookie attached) and extracts image entries from the activity table in the
/// response. Each table row carries the activity date in its second cell and
/// a download anchor (`href` = signed URL, `download` = filename) in its
/// last cell; a response without an activity table means the page is past
/// the end of the feed.
pub struct HttpActivityFeed {
    client: reqwest::Client,
    base_url: Url,
    config: DiscoveryConfig,
    extractor: TableExtractor,
}

impl HttpActivityFeed {
    /// Create the adapter from a validated discovery configuration
    ///
    /// # Errors
    ///
    /// Returns a config error when the configuration is invalid or the base
    /// URL does not parse, and a network error when the HTTP client cannot
    /// be created.
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::config(format!("invalid base URL {}: {}", config.base_url, e), Some("base_url"))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("journal-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            config,
            extractor: TableExtractor::new()?,
        })
    }

    /// Listing URL for one page
    fn activities_url(&self, page: u32) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("accounts/{}/activities", self.config.account_id))
            .map_err(|e| {
                Error::config(
                    format!("cannot build listing URL from {}: {}", self.base_url, e),
                    Some("base_url"),
                )
            })?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }
}

#[async_trait]
impl ActivityFeed for HttpActivityFeed {
    async fn fetch_page(&self, page: u32) -> Result<Vec<ActivityEntry>> {
        let url = self.activities_url(page)?;
        tracing::debug!(page, url = %url, "fetching activity page");

        let response = self
            .client
            .get(url)
            .header(
                header::COOKIE,
                format!("{}={}", self.config.session_cookie, self.config.session_value),
            )
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth {
                account: self.config.account_id.clone(),
            });
        }
        if !status.is_success() {
            return Err(Error::FeedStatus {
                page,
                status: status.as_u16(),
            });
        }

        // An expired session redirects to the sign-in page with a 200. That
        // must surface as an auth failure, not as an empty (final) page.
        let final_path = response.url().path().to_ascii_lowercase();
        if final_path.contains("sign_in") || final_path.contains("login") {
            return Err(Error::Auth {
                account: self.config.account_id.clone(),
            });
        }

        let body = response.text().await?;
        self.extractor.entries(&body, page, &self.base_url)
    }
}

/// Pulls image entries out of the activity table markup
///
/// The pack carries no HTML parser, and the table contract is narrow enough
/// (one tbody, date cell second, download anchor last) that anchored regexes
/// over the row markup are sufficient.
struct TableExtractor {
    tbody: Regex,
    row: Regex,
    cell: Regex,
    href: Regex,
    download: Regex,
    tag: Regex,
}

impl TableExtractor {
    fn new() -> Result<Self> {
        Ok(Self {
            tbody: compile(r"(?s)<tbody[^>]*>(.*?)</tbody>")?,
            row: compile(r"(?s)<tr[^>]*>(.*?)</tr>")?,
            cell: compile(r"(?s)<td[^>]*>(.*?)</td>")?,
            href: compile(r#"href\s*=\s*"([^"]+)""#)?,
            download: compile(r#"download\s*=\s*"([^"]+)""#)?,
            tag: compile(r"<[^>]+>")?,
        })
    }

    /// Extract all image entries from one page's markup
    ///
    /// No activity table means the page is past the end of the feed: an
    /// empty list, not an error. Rows without a download anchor (activities
    /// with no attached image) are skipped.
    fn entries(&self, body: &str, page: u32, base_url: &Url) -> Result<Vec<ActivityEntry>> {
        let Some(tbody) = self.tbody.captures(body).and_then(|c| c.get(1)) else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for row in self.row.captures_iter(tbody.as_str()) {
            let row = &row[1];
            let cells: Vec<&str> = self
                .cell
                .captures_iter(row)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();
            if cells.len() < 2 {
                continue;
            }

            // The last cell holds the download anchor; rows without one are
            // activities with no attached image.
            let last = cells[cells.len() - 1];
            let (Some(href), Some(file_name)) = (
                self.href.captures(last).map(|c| c[1].to_string()),
                self.download.captures(last).map(|c| c[1].to_string()),
            ) else {
                tracing::debug!(page, "skipping activity row without a download link");
                continue;
            };

            let date_text = self.tag.replace_all(cells[1], "");
            let date_text = date_text.trim();
            let captured_at =
                NaiveDate::parse_from_str(date_text, "%m/%d/%y").map_err(|e| Error::FeedParse {
                    page,
                    reason: format!("unparseable activity date {date_text:?}: {e}"),
                })?;

            let url = base_url.join(&href).map_err(|e| Error::FeedParse {
                page,
                reason: format!("unparseable download link {href:?}: {e}"),
            })?;

            let file_name =
                crate::utils::sanitize_file_name(&file_name).ok_or_else(|| Error::FeedParse {
                    page,
                    reason: format!("unusable download filename {file_name:?}"),
                })?;

            entries.push(ActivityEntry {
                id: object_key(&url, &file_name),
                url: url.to_string(),
                captured_at,
                file_name,
            });
        }

        tracing::debug!(page, entries = entries.len(), "activity page extracted");
        Ok(entries)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::config(format!("invalid extraction pattern: {e}"), None))
}

/// Storage object key for a signed URL: the last path segment, query
/// stripped. Falls back to the advertised filename for pathless URLs.
fn object_key(url: &Url, file_name: &str) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(file_name)
        .to_string()
}

//! Command-line surface for the archiver
//!
//! Two subcommands share the index file: `download` discovers records and
//! (unless `--index-only`) downloads them; `resume` re-downloads everything
//! in an existing index. Despite the name, `resume` is a full redownload
//! from the index; nothing is diffed or skipped.

use clap::{Args, Parser, Subcommand};
use indicatif::ProgressBar;
use std::path::PathBuf;

use crate::config::{DiscoveryConfig, DownloadConfig};
use crate::discovery::DiscoveryPaginator;
use crate::downloader::DownloadCoordinator;
use crate::error::Result;
use crate::feed::HttpActivityFeed;
use crate::index::Index;

/// Archive images from a daycare's web journal
#[derive(Parser)]
#[command(name = "journal-dl", version, about)]
pub struct Cli {
    /// The operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Discover images from the activity feed, write the index file, and
    /// download everything found
    Download(DownloadArgs),

    /// Re-download every image listed in an existing index file
    ///
    /// Existing files are overwritten; signed URLs older than a few hours
    /// will have expired and need a fresh `download` run instead.
    Resume(ResumeArgs),
}

/// Arguments for the `download` subcommand
#[derive(Args)]
pub struct DownloadArgs {
    /// Account identifier from the journal
    #[arg(long)]
    pub account: String,

    /// Value of the journal's session cookie (grab it from the browser's
    /// cookie store while logged in)
    #[arg(long = "session-value", env = "JOURNAL_DL_SESSION", hide_env_values = true)]
    pub session_value: String,

    /// First page to fetch
    #[arg(long, default_value_t = 1)]
    pub start_page: u32,

    /// Last page to fetch, inclusive (omit to paginate until the feed ends)
    #[arg(long)]
    pub end_page: Option<u32>,

    /// Base URL of the journal application
    #[arg(long, default_value = "https://classroom.kindercare.com")]
    pub base_url: String,

    /// Where to write the index file
    #[arg(long, default_value = "index.json")]
    pub index_file: PathBuf,

    /// Write the index file and skip downloading
    #[arg(long)]
    pub index_only: bool,

    /// Download-phase options
    #[command(flatten)]
    pub fetch: FetchArgs,
}

/// Arguments for the `resume` subcommand
#[derive(Args)]
pub struct ResumeArgs {
    /// Index file written by a previous `download` run
    #[arg(long, default_value = "index.json")]
    pub index_file: PathBuf,

    /// Download-phase options
    #[command(flatten)]
    pub fetch: FetchArgs,
}

/// Options shared by both subcommands' download phase
#[derive(Args)]
pub struct FetchArgs {
    /// Number of parallel download workers
    #[arg(long, default_value_t = 10)]
    pub workers: usize,

    /// Put every file directly in the output directory instead of
    /// year/month subfolders
    #[arg(long)]
    pub flatten: bool,

    /// Output root directory
    #[arg(long, default_value = "downloads")]
    pub output_dir: PathBuf,
}

impl FetchArgs {
    fn to_config(&self) -> DownloadConfig {
        DownloadConfig {
            output_dir: self.output_dir.clone(),
            workers: self.workers,
            flatten: self.flatten,
            ..Default::default()
        }
    }
}

/// Execute a parsed invocation
///
/// # Errors
///
/// Returns an error (and thus a non-zero exit) for unrecoverable
/// authentication, discovery, or index failures. Individual download
/// failures are reported on stdout and do not fail the run.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Download(args) => download(args).await,
        Command::Resume(args) => resume(args).await,
    }
}

async fn download(args: DownloadArgs) -> Result<()> {
    let discovery = DiscoveryConfig {
        base_url: args.base_url,
        start_page: args.start_page,
        end_page: args.end_page,
        ..DiscoveryConfig::new(args.account, args.session_value)
    };

    let feed = HttpActivityFeed::new(discovery.clone())?;
    let index = DiscoveryPaginator::new(feed, discovery).run(&args.index_file).await?;

    println!(
        "Wrote index file to {} with {} images",
        args.index_file.display(),
        index.len()
    );

    if args.index_only {
        println!("Skipping download due to --index-only");
        return Ok(());
    }

    redownload_from_index(&index, &args.fetch).await
}

async fn resume(args: ResumeArgs) -> Result<()> {
    let index = Index::load(&args.index_file).await?;
    println!(
        "Loaded index file {} with {} images",
        args.index_file.display(),
        index.len()
    );
    redownload_from_index(&index, &args.fetch).await
}

/// Run the download coordinator over an index and report the outcome
///
/// "Resume" is a misnomer in the UI: this is a full redownload of the index,
/// and that is the contract this function's name records.
async fn redownload_from_index(index: &Index, fetch: &FetchArgs) -> Result<()> {
    let coordinator = DownloadCoordinator::new(fetch.to_config())?;

    println!("Downloading {} images", index.len());
    let bar = ProgressBar::new(index.len() as u64);
    let summary = coordinator.run_with_observer(index, |_| bar.inc(1)).await;
    bar.finish();

    println!(
        "Downloaded {} of {} images",
        summary.succeeded(),
        summary.attempted()
    );
    for failure in summary.failures() {
        if let Err(e) = &failure.result {
            println!("  failed: {} ({})", failure.record.id, e);
        }
    }
    if !summary.all_succeeded() {
        println!(
            "Expired links cannot be retried from this index; run `download` again to \
             re-discover them."
        );
    }
    Ok(())
}

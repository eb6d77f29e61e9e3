//! Cleans the lyrics of a single file or a folder tree in place.
//!
//! Run with:
//! ```bash
//! # Preview what would be removed
//! cargo run --example clean_folder -- ~/Music --dry-run
//!
//! # Clean FLAC and MP3 files, keeping .backup copies
//! cargo run --example clean_folder -- ~/Music --backup --filter-ext .flac,.mp3
//!
//! # Only count files
//! cargo run --example clean_folder -- ~/Music --stats
//!
//! # JSON logs
//! cargo run --example clean_folder -- ~/Music --log json
//! ```

use anyhow::{bail, Context};
use core_metadata::{LyricsSanitizer, TagAccessor};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{
    survey, write_failure_log, BatchOrchestrator, ExtensionFilter, FileIdentityRegistry,
    FileSet, ProcessMode,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const USAGE: &str =
    "Usage: clean_folder <path> [--dry-run] [--backup] [--filter-ext .mp3,.flac] [--stats] [--log json]";

struct Args {
    path: PathBuf,
    dry_run: bool,
    backup: bool,
    stats: bool,
    filter: Option<ExtensionFilter>,
    log_format: LogFormat,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut path = None;
    let mut args = Args {
        path: PathBuf::new(),
        dry_run: false,
        backup: false,
        stats: false,
        filter: None,
        log_format: LogFormat::default(),
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-d" | "--dry-run" => args.dry_run = true,
            "-b" | "--backup" => args.backup = true,
            "--stats" => args.stats = true,
            "--filter-ext" => {
                let list = iter.next().context("--filter-ext needs a value, e.g. .mp3,.flac")?;
                args.filter = Some(ExtensionFilter::parse(&list)?);
            }
            "--log" => {
                let format = iter.next().context("--log needs pretty, json or compact")?;
                args.log_format = format.parse()?;
            }
            other if other.starts_with('-') => bail!("Unknown option: {}", other),
            other => path = Some(PathBuf::from(other)),
        }
    }

    args.path = path.context(USAGE)?;
    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    init_logging(LoggingConfig::default().with_format(args.log_format))?;

    if !args.path.exists() {
        bail!("Path does not exist: {}", args.path.display());
    }

    if args.stats {
        if args.path.is_dir() {
            let stats = survey(&args.path)?;
            println!("Directory: {}", args.path.display());
            println!("  Files:       {}", stats.total_files);
            println!("  Audio files: {}", stats.audio_files);
        } else {
            println!("{} is a single file", args.path.display());
        }
        return Ok(());
    }

    let file_set = if args.path.is_dir() {
        FileSet::Directory(args.path.clone())
    } else {
        FileSet::Single(args.path.clone())
    };
    let mode = ProcessMode::default()
        .with_dry_run(args.dry_run)
        .with_backup(args.backup && !args.dry_run)
        .with_extension_filter(args.filter);

    let orchestrator = BatchOrchestrator::new(
        Arc::new(TagAccessor::new()),
        Arc::new(LyricsSanitizer::new()),
    );
    let report = orchestrator.run(file_set, &mode).await?;

    for file in &report.succeeded {
        println!("{:<12} {}", file.outcome.label(), file.file);
        if args.dry_run {
            for line in &file.removed_lines {
                println!("             - {}", line.trim_end_matches('\r'));
            }
        }
    }

    println!();
    println!("{}", if report.dry_run { "Preview summary" } else { "Summary" });
    println!("  Considered:    {}", report.total);
    println!("  Succeeded:     {}", report.processed);
    println!("  Cleaned:       {}", report.cleaned);
    println!("  Header free:   {}", report.header_free);
    println!("  No lyrics:     {}", report.no_lyrics);
    println!("  Skipped:       {}", report.skipped);
    println!("  Failed:        {}", report.failed);
    println!("  Lines removed: {}", report.total_removed);

    let log_dir = if args.path.is_dir() {
        args.path.clone()
    } else {
        args.path.parent().map(PathBuf::from).unwrap_or_default()
    };
    if let Some(log) = write_failure_log(&log_dir, &report, &FileIdentityRegistry::new())? {
        info!(path = %log.display(), "Failed files exported");
        println!("  Failure log:   {}", log.display());
    }

    Ok(())
}

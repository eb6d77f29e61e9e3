//! # Batch Orchestrator
//!
//! Runs the read → sanitize → backup → write sequence over a set of files.
//!
//! ## Overview
//!
//! A run resolves its [`FileSet`] into an ordered plan, then processes every
//! planned file as one blocking unit under a semaphore bound. Units never
//! share state; their [`FileReport`]s are collected in plan order once all of
//! them finish and folded into a [`BatchReport`].
//!
//! ## Per-file states
//!
//! ```text
//! Inspected ─┬─> NoLyrics
//!            ├─> HeaderFree
//!            └─> HasHeaders ──> (BackedUp) ──> Written ──> Cleaned
//!
//! any failing step ──> Failed { kind, reason }
//! ```
//!
//! Per-file failures are data in the report. `run` itself only fails when the
//! request as a whole is unusable (missing root, empty list).
//!
//! ## Usage
//!
//! ```no_run
//! use core_metadata::{LyricsSanitizer, TagAccessor};
//! use core_service::orchestrator::{BatchOrchestrator, FileSet, ProcessMode};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_service::Result<()> {
//! let orchestrator = BatchOrchestrator::new(
//!     Arc::new(TagAccessor::new()),
//!     Arc::new(LyricsSanitizer::new()),
//! );
//!
//! let report = orchestrator
//!     .run(FileSet::Directory("/music".into()), &ProcessMode::default().with_dry_run(true))
//!     .await?;
//! println!("{} lines would be removed", report.total_removed);
//! # Ok(())
//! # }
//! ```

use core_metadata::{
    is_supported_audio_file, AudioContainer, BackupManager, LyricsSanitizer, LyricsStore,
    MetadataError,
};
use core_runtime::config::DEFAULT_MAX_CONCURRENT;
use core_runtime::events::{BatchEvent, CoreEvent, EventBus};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};

// =============================================================================
// Inputs
// =============================================================================

/// Files a run operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSet {
    /// One file; its parent acts as the root.
    Single(PathBuf),
    /// Every supported audio file below the root, in file-name order.
    Directory(PathBuf),
    /// Explicit `/`-separated keys relative to `root`.
    List { root: PathBuf, keys: Vec<String> },
}

/// Restricts a run to a set of extensions, e.g. `.mp3,.flac`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Builds a filter from dotted extensions; matching is case-insensitive.
    pub fn new<I, S>(extensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().to_lowercase();
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(CoreError::InvalidInput(format!(
                    "Extension '{}' must start with a dot, e.g. .mp3,.flac",
                    ext
                )));
            }
            parsed.push(ext);
        }

        if parsed.is_empty() {
            return Err(CoreError::InvalidInput(
                "Extension filter cannot be empty".to_string(),
            ));
        }

        Ok(Self { extensions: parsed })
    }

    /// Parses a comma separated list such as `.mp3, .FLAC`.
    pub fn parse(list: &str) -> Result<Self> {
        Self::new(list.split(','))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn allows(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let dotted = format!(".{}", ext.to_lowercase());
                self.extensions.iter().any(|allowed| *allowed == dotted)
            })
            .unwrap_or(false)
    }
}

/// Where cleaned lyrics are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    /// Rewrite the lyrics of the file itself.
    #[default]
    InPlace,
    /// Copy the file to `root/<prefix><relative path>` and clean the copy.
    /// The source is never modified, so no backup is taken.
    CopyTo { root: PathBuf, prefix: String },
}

/// Options for one run.
#[derive(Debug, Clone, Default)]
pub struct ProcessMode {
    /// Report what would change without touching any file
    pub dry_run: bool,
    /// Back up each file before rewriting it in place
    pub backup: bool,
    pub extension_filter: Option<ExtensionFilter>,
    pub output: OutputTarget,
}

impl ProcessMode {
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_extension_filter(mut self, filter: Option<ExtensionFilter>) -> Self {
        self.extension_filter = filter;
        self
    }

    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }
}

// =============================================================================
// Outcomes and reports
// =============================================================================

/// Why a single file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    NotFound,
    InvalidInput,
    ReadFailure,
    BackupFailure,
    WriteFailure,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::ReadFailure => "read_failure",
            Self::BackupFailure => "backup_failure",
            Self::WriteFailure => "write_failure",
            Self::Internal => "internal",
        }
    }

    /// Maps a metadata error, using `fallback` for plain read/write/IO errors.
    fn classify(err: &MetadataError, fallback: FailureKind) -> Self {
        match err {
            MetadataError::UnsupportedFormat(_) => Self::UnsupportedFormat,
            MetadataError::FileNotFound(_) => Self::NotFound,
            MetadataError::InvalidInput(_) => Self::InvalidInput,
            MetadataError::BackupFailed(_) => Self::BackupFailure,
            _ => fallback,
        }
    }
}

/// Terminal state of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// Readable, but carries no lyrics
    NoLyrics,
    /// Lyrics were (or in a dry run would be) rewritten; `0` means header free
    Cleaned { removed_lines: usize },
    Failed { kind: FailureKind, reason: String },
}

impl ProcessOutcome {
    pub fn is_header_free(&self) -> bool {
        matches!(self, Self::Cleaned { removed_lines: 0 })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Label used in events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoLyrics => "no_lyrics",
            Self::Cleaned { removed_lines: 0 } => "header_free",
            Self::Cleaned { .. } => "cleaned",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Result for one file of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Identifier within the run: relative key or file name
    pub file: String,
    pub outcome: ProcessOutcome,
    /// Removed header lines, for preview and audit
    pub removed_lines: Vec<String>,
    pub backup_path: Option<PathBuf>,
    /// Key of the cleaned copy relative to the output root (`CopyTo` only)
    pub output_key: Option<String>,
    pub output_path: Option<PathBuf>,
}

impl FileReport {
    fn new(file: impl Into<String>, outcome: ProcessOutcome) -> Self {
        Self {
            file: file.into(),
            outcome,
            removed_lines: Vec::new(),
            backup_path: None,
            output_key: None,
            output_path: None,
        }
    }

    fn failed(file: impl Into<String>, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self::new(
            file,
            ProcessOutcome::Failed {
                kind,
                reason: reason.into(),
            },
        )
    }

    fn removed_count(&self) -> usize {
        match self.outcome {
            ProcessOutcome::Cleaned { removed_lines } => removed_lines,
            _ => 0,
        }
    }
}

/// A failed file and its reason, as listed in failure logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub file: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Aggregate of one run. Immutable once returned.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub dry_run: bool,
    /// Files considered, including skipped and failed ones
    pub total: usize,
    /// Files that reached a non-failed terminal state
    pub processed: usize,
    pub no_lyrics: usize,
    pub header_free: usize,
    pub cleaned: usize,
    /// Files rejected by the extension filter
    pub skipped: usize,
    pub failed: usize,
    pub total_removed: usize,
    pub succeeded: Vec<FileReport>,
    pub failed_files: Vec<FailedFile>,
    pub skipped_files: Vec<String>,
    pub duration_ms: u64,
}

impl BatchReport {
    fn new(batch_id: String, dry_run: bool) -> Self {
        Self {
            batch_id,
            dry_run,
            total: 0,
            processed: 0,
            no_lyrics: 0,
            header_free: 0,
            cleaned: 0,
            skipped: 0,
            failed: 0,
            total_removed: 0,
            succeeded: Vec::new(),
            failed_files: Vec::new(),
            skipped_files: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_files.is_empty()
    }

    fn record(&mut self, entry: PlanResult) {
        self.total += 1;
        let report = match entry {
            PlanResult::Skipped(file) => {
                self.skipped += 1;
                self.skipped_files.push(file);
                return;
            }
            PlanResult::Done(report) => report,
        };

        match &report.outcome {
            ProcessOutcome::Failed { kind, reason } => {
                self.failed += 1;
                self.failed_files.push(FailedFile {
                    file: report.file.clone(),
                    kind: *kind,
                    reason: reason.clone(),
                });
                return;
            }
            ProcessOutcome::NoLyrics => self.no_lyrics += 1,
            ProcessOutcome::Cleaned { removed_lines: 0 } => self.header_free += 1,
            ProcessOutcome::Cleaned { removed_lines } => {
                self.cleaned += 1;
                self.total_removed += removed_lines;
            }
        }
        self.processed += 1;
        self.succeeded.push(report);
    }
}

/// File counts below a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DirectoryStats {
    pub total_files: usize,
    pub audio_files: usize,
}

/// Counts all files and supported audio files below `root`.
pub fn survey(root: &Path) -> Result<DirectoryStats> {
    if !root.is_dir() {
        return Err(CoreError::WorkingRootMissing(root.display().to_string()));
    }

    let mut stats = DirectoryStats::default();
    for entry in WalkDir::new(root).into_iter() {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        if entry.file_type().is_file() {
            stats.total_files += 1;
            if is_supported_audio_file(entry.path()) {
                stats.audio_files += 1;
            }
        }
    }
    Ok(stats)
}

// =============================================================================
// Planning
// =============================================================================

#[derive(Debug)]
struct WorkItem {
    label: String,
    path: PathBuf,
}

#[derive(Debug)]
enum Planned {
    Process(WorkItem),
    Skip(String),
    Reject(FileReport),
}

#[derive(Debug)]
enum PlanResult {
    Done(FileReport),
    Skipped(String),
}

fn plan(file_set: FileSet, filter: Option<&ExtensionFilter>) -> Result<Vec<Planned>> {
    let admit = |label: String, path: PathBuf| match filter {
        Some(filter) if !filter.allows(&path) => Planned::Skip(label),
        _ => Planned::Process(WorkItem { label, path }),
    };

    match file_set {
        FileSet::Single(path) => {
            if !path.is_file() {
                return Err(CoreError::WorkingRootMissing(path.display().to_string()));
            }
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(vec![admit(label, path)])
        }
        FileSet::Directory(root) => {
            if !root.is_dir() {
                return Err(CoreError::WorkingRootMissing(root.display().to_string()));
            }
            let mut planned = Vec::new();
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let label = e
                            .path()
                            .map(|p| relative_label(&root, p))
                            .unwrap_or_else(|| root.display().to_string());
                        warn!(path = %label, error = %e, "Failed to walk directory entry");
                        planned.push(Planned::Reject(FileReport::failed(
                            label,
                            FailureKind::ReadFailure,
                            e.to_string(),
                        )));
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !is_supported_audio_file(entry.path()) {
                    continue;
                }
                let label = relative_label(&root, entry.path());
                planned.push(admit(label, entry.into_path()));
            }
            Ok(planned)
        }
        FileSet::List { root, keys } => {
            if keys.is_empty() {
                return Err(CoreError::EmptyFileList);
            }
            if !root.is_dir() {
                return Err(CoreError::WorkingRootMissing(root.display().to_string()));
            }
            // Keys naming the same file run once; later spellings are skipped
            let mut seen = HashSet::new();
            Ok(keys
                .into_iter()
                .map(|key| match confined_join(&root, &key) {
                    Some(path) => {
                        let identity = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
                        if seen.insert(identity) {
                            admit(key, path)
                        } else {
                            debug!(key = %key, "Skipping duplicate key");
                            Planned::Skip(key)
                        }
                    }
                    None => Planned::Reject(FileReport::failed(
                        key,
                        FailureKind::InvalidInput,
                        "Path escapes the working root",
                    )),
                })
                .collect())
        }
    }
}

/// Joins `key` under `root` unless it is absolute, empty or climbs out.
///
/// `.` components are dropped, so `./a.mp3` and `a.mp3` join to one path.
pub(crate) fn confined_join(root: &Path, key: &str) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();
    let mut saw_normal = false;
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                saw_normal = true;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    saw_normal.then_some(joined)
}

fn relative_label(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// =============================================================================
// Per-file unit
// =============================================================================

/// Everything a blocking unit needs, cloned into each task.
#[derive(Clone)]
struct Unit {
    store: Arc<dyn LyricsStore>,
    sanitizer: Arc<LyricsSanitizer>,
    backups: BackupManager,
    mode: Arc<ProcessMode>,
    batch_id: Arc<str>,
    event_bus: Option<EventBus>,
}

impl Unit {
    fn run(&self, item: WorkItem) -> FileReport {
        let report = self.process(&item);
        debug!(
            file = %report.file,
            outcome = report.outcome.label(),
            "File finished"
        );
        self.announce(&report);
        report
    }

    fn process(&self, item: &WorkItem) -> FileReport {
        let WorkItem { label, path } = item;

        if !path.is_file() {
            return FileReport::failed(label.as_str(), FailureKind::NotFound, "File does not exist");
        }
        if let Err(e) = AudioContainer::from_path(path) {
            return FileReport::failed(label.as_str(), FailureKind::UnsupportedFormat, e.to_string());
        }

        let lyrics = match self.store.read_lyrics(path) {
            Ok(Some(lyrics)) => lyrics,
            Ok(None) => return FileReport::new(label.as_str(), ProcessOutcome::NoLyrics),
            Err(e) => {
                let kind = FailureKind::classify(&e, FailureKind::ReadFailure);
                return FileReport::failed(label.as_str(), kind, e.to_string());
            }
        };

        let sanitized = self.sanitizer.sanitize(&lyrics);
        let mut report = FileReport::new(
            label.as_str(),
            ProcessOutcome::Cleaned {
                removed_lines: sanitized.removed_count(),
            },
        );

        if self.mode.dry_run {
            report.removed_lines = sanitized.removed_lines;
            return report;
        }

        let result = match &self.mode.output {
            OutputTarget::InPlace => self.write_in_place(
                path,
                &sanitized.cleaned,
                sanitized.has_changes(),
                &mut report,
            ),
            OutputTarget::CopyTo { root, prefix } => self.write_copy(
                label,
                path,
                root,
                prefix,
                &sanitized.cleaned,
                sanitized.has_changes(),
                &mut report,
            ),
        };

        match result {
            Ok(()) => {
                report.removed_lines = sanitized.removed_lines;
                report
            }
            Err((kind, reason)) => FileReport::failed(label.as_str(), kind, reason),
        }
    }

    fn write_in_place(
        &self,
        path: &Path,
        cleaned: &str,
        has_changes: bool,
        report: &mut FileReport,
    ) -> std::result::Result<(), (FailureKind, String)> {
        if !has_changes {
            return Ok(());
        }

        if self.mode.backup {
            let backup = self
                .backups
                .backup(path)
                .map_err(|e| (FailureKind::classify(&e, FailureKind::BackupFailure), e.to_string()))?;
            report.backup_path = Some(backup);
        }

        self.store
            .write_lyrics(path, cleaned)
            .map_err(|e| (FailureKind::classify(&e, FailureKind::WriteFailure), e.to_string()))?;
        report.output_path = Some(path.to_path_buf());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_copy(
        &self,
        label: &str,
        source: &Path,
        root: &Path,
        prefix: &str,
        cleaned: &str,
        has_changes: bool,
        report: &mut FileReport,
    ) -> std::result::Result<(), (FailureKind, String)> {
        let output_key = format!("{}{}", prefix, label);
        let destination = root.join(&output_key);

        let copy = || -> std::io::Result<()> {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source, &destination).map(|_| ())
        };
        copy().map_err(|e| {
            (
                FailureKind::WriteFailure,
                format!("Failed to copy to {}: {}", output_key, e),
            )
        })?;

        if has_changes {
            if let Err(e) = self.store.write_lyrics(&destination, cleaned) {
                // An uncleaned copy must not be offered as output
                if let Err(remove) = fs::remove_file(&destination) {
                    warn!(file = %output_key, error = %remove, "Failed to remove uncleaned copy");
                }
                return Err((FailureKind::classify(&e, FailureKind::WriteFailure), e.to_string()));
            }
        }

        report.output_key = Some(output_key);
        report.output_path = Some(destination);
        Ok(())
    }

    fn announce(&self, report: &FileReport) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Batch(BatchEvent::FileProcessed {
                batch_id: self.batch_id.to_string(),
                file: report.file.clone(),
                outcome: report.outcome.label().to_string(),
                removed_lines: report.removed_count(),
                failed: report.outcome.is_failure(),
            }));
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs batches of files through the cleaning sequence.
pub struct BatchOrchestrator {
    store: Arc<dyn LyricsStore>,
    sanitizer: Arc<LyricsSanitizer>,
    backups: BackupManager,
    max_concurrent: usize,
    event_bus: Option<EventBus>,
}

impl BatchOrchestrator {
    pub fn new(store: Arc<dyn LyricsStore>, sanitizer: Arc<LyricsSanitizer>) -> Self {
        Self {
            store,
            sanitizer,
            backups: BackupManager::new(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            event_bus: None,
        }
    }

    /// Bounds how many files are processed at once (minimum 1).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_backup_manager(mut self, backups: BackupManager) -> Self {
        self.backups = backups;
        self
    }

    /// Publishes progress events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Processes `file_set` and returns the aggregated report.
    ///
    /// # Errors
    ///
    /// - `CoreError::EmptyFileList` for an empty explicit list
    /// - `CoreError::WorkingRootMissing` when the root or single file is absent
    ///
    /// Every per-file problem is reported inside the returned [`BatchReport`].
    #[instrument(skip(self, file_set, mode), fields(dry_run = mode.dry_run))]
    pub async fn run(&self, file_set: FileSet, mode: &ProcessMode) -> Result<BatchReport> {
        let started = Instant::now();
        let planned = plan(file_set, mode.extension_filter.as_ref())?;
        let batch_id = uuid::Uuid::new_v4().to_string();

        info!(
            batch_id = %batch_id,
            total_files = planned.len(),
            backup = mode.backup,
            "Starting batch run"
        );
        self.emit(BatchEvent::Started {
            batch_id: batch_id.clone(),
            total_files: planned.len(),
            dry_run: mode.dry_run,
        });

        let unit = Unit {
            store: Arc::clone(&self.store),
            sanitizer: Arc::clone(&self.sanitizer),
            backups: self.backups.clone(),
            mode: Arc::new(mode.clone()),
            batch_id: Arc::from(batch_id.as_str()),
            event_bus: self.event_bus.clone(),
        };
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let tasks = planned.into_iter().map(|entry| {
            let unit = unit.clone();
            let semaphore = Arc::clone(&semaphore);
            async move {
                let item = match entry {
                    Planned::Skip(label) => return PlanResult::Skipped(label),
                    Planned::Reject(report) => {
                        unit.announce(&report);
                        return PlanResult::Done(report);
                    }
                    Planned::Process(item) => item,
                };

                let label = item.label.clone();
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return PlanResult::Done(FileReport::failed(
                            label,
                            FailureKind::Internal,
                            e.to_string(),
                        ))
                    }
                };

                let worker = unit.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    worker.run(item)
                });
                match handle.await {
                    Ok(report) => PlanResult::Done(report),
                    Err(e) => {
                        warn!(file = %label, error = %e, "File task panicked");
                        let report =
                            FileReport::failed(label, FailureKind::Internal, e.to_string());
                        unit.announce(&report);
                        PlanResult::Done(report)
                    }
                }
            }
        });

        let mut report = BatchReport::new(batch_id, mode.dry_run);
        for result in join_all(tasks).await {
            report.record(result);
        }
        report.duration_ms = started.elapsed().as_millis() as u64;

        for failed in &report.failed_files {
            warn!(file = %failed.file, kind = failed.kind.as_str(), reason = %failed.reason, "File failed");
        }
        info!(
            batch_id = %report.batch_id,
            processed = report.processed,
            cleaned = report.cleaned,
            header_free = report.header_free,
            no_lyrics = report.no_lyrics,
            skipped = report.skipped,
            failed = report.failed,
            total_removed = report.total_removed,
            "Batch run completed"
        );
        self.emit(BatchEvent::Completed {
            batch_id: report.batch_id.clone(),
            processed: report.processed,
            cleaned: report.cleaned,
            skipped: report.skipped,
            failed: report.failed,
            total_removed: report.total_removed,
            duration_ms: report.duration_ms,
        });

        Ok(report)
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Batch(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extension_filter_parse() {
        let filter = ExtensionFilter::parse(".mp3, .FLAC").unwrap();
        assert_eq!(filter.extensions(), &[".mp3".to_string(), ".flac".to_string()]);
        assert!(filter.allows(Path::new("a/song.MP3")));
        assert!(filter.allows(Path::new("song.flac")));
        assert!(!filter.allows(Path::new("song.m4a")));
        assert!(!filter.allows(Path::new("README")));
    }

    #[test]
    fn test_extension_filter_requires_dot() {
        assert!(matches!(
            ExtensionFilter::parse("mp3,.flac"),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(ExtensionFilter::parse(" . "), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_confined_join_rejects_escapes() {
        let root = Path::new("/uploads");
        assert_eq!(
            confined_join(root, "album/song.mp3"),
            Some(PathBuf::from("/uploads/album/song.mp3"))
        );
        assert_eq!(
            confined_join(root, "./album//song.mp3"),
            Some(PathBuf::from("/uploads/album/song.mp3"))
        );
        assert_eq!(confined_join(root, "../etc/passwd"), None);
        assert_eq!(confined_join(root, "album/../../x.mp3"), None);
        assert_eq!(confined_join(root, "/abs/song.mp3"), None);
        assert_eq!(confined_join(root, ""), None);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ProcessOutcome::NoLyrics.label(), "no_lyrics");
        assert_eq!(ProcessOutcome::Cleaned { removed_lines: 0 }.label(), "header_free");
        assert_eq!(ProcessOutcome::Cleaned { removed_lines: 3 }.label(), "cleaned");
        assert!(ProcessOutcome::Cleaned { removed_lines: 0 }.is_header_free());

        let failed = ProcessOutcome::Failed {
            kind: FailureKind::WriteFailure,
            reason: "disk full".to_string(),
        };
        assert_eq!(failed.label(), "failed");
        assert!(failed.is_failure());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(ProcessOutcome::Failed {
            kind: FailureKind::BackupFailure,
            reason: "denied".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "backup_failure");
    }

    #[test]
    fn test_plan_directory_ignores_non_audio_and_skips_filtered() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("album")).unwrap();
        fs::write(dir.path().join("album/b.flac"), b"x").unwrap();
        fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"x").unwrap();

        let filter = ExtensionFilter::parse(".mp3").unwrap();
        let planned = plan(FileSet::Directory(dir.path().to_path_buf()), Some(&filter)).unwrap();

        assert_eq!(planned.len(), 2);
        assert!(matches!(&planned[0], Planned::Process(item) if item.label == "a.mp3"));
        assert!(matches!(&planned[1], Planned::Skip(label) if label == "album/b.flac"));
    }

    #[test]
    fn test_plan_rejects_empty_list_and_missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            plan(
                FileSet::List {
                    root: dir.path().to_path_buf(),
                    keys: vec![]
                },
                None
            ),
            Err(CoreError::EmptyFileList)
        ));
        assert!(matches!(
            plan(FileSet::Directory(dir.path().join("missing")), None),
            Err(CoreError::WorkingRootMissing(_))
        ));
        assert!(matches!(
            plan(FileSet::Single(dir.path().join("missing.mp3")), None),
            Err(CoreError::WorkingRootMissing(_))
        ));
    }

    #[test]
    fn test_plan_list_runs_each_file_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        fs::write(dir.path().join("b.mp3"), b"x").unwrap();

        let planned = plan(
            FileSet::List {
                root: dir.path().to_path_buf(),
                keys: vec![
                    "a.mp3".to_string(),
                    "./a.mp3".to_string(),
                    "b.mp3".to_string(),
                    "a.mp3".to_string(),
                ],
            },
            None,
        )
        .unwrap();

        assert_eq!(planned.len(), 4);
        assert!(matches!(&planned[0], Planned::Process(item) if item.label == "a.mp3"));
        assert!(matches!(&planned[1], Planned::Skip(label) if label == "./a.mp3"));
        assert!(matches!(&planned[2], Planned::Process(item) if item.label == "b.mp3"));
        assert!(matches!(&planned[3], Planned::Skip(label) if label == "a.mp3"));
    }

    #[test]
    fn test_survey_counts_audio_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        fs::write(dir.path().join("sub/b.M4A"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let stats = survey(dir.path()).unwrap();
        assert_eq!(
            stats,
            DirectoryStats {
                total_files: 3,
                audio_files: 2
            }
        );
    }
}

//! # Cleaner Session
//!
//! The façade a host shell (web upload page, CLI) drives.
//!
//! A session owns the working directories from [`CleanerConfig`], the
//! [`FileIdentityRegistry`] for everything uploaded through it, and an
//! [`EventBus`] for progress. Files are stored under generated working keys;
//! every name shown back to the user is resolved through the registry.
//!
//! ```no_run
//! use core_runtime::config::CleanerConfig;
//! use core_service::session::{CleanerSession, ProcessOptions};
//!
//! # async fn example(bytes: Vec<u8>) -> core_service::Result<()> {
//! let config = CleanerConfig::builder()
//!     .upload_dir("/srv/mmc/uploads")
//!     .processed_dir("/srv/mmc/processed")
//!     .build()?;
//! let session = CleanerSession::new(config)?;
//!
//! let record = session.intake("Album/01 Song.mp3", bytes).await?;
//! let report = session
//!     .process(vec![record.working_key], ProcessOptions::default())
//!     .await?;
//! session.export_failure_log(&report)?;
//! # Ok(())
//! # }
//! ```

use core_metadata::{
    is_supported_audio_file, HeaderKeywords, LyricsSanitizer, LyricsStore, TagAccessor,
};
use core_runtime::config::CleanerConfig;
use core_runtime::logging::strip_path;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{CoreError, Result};
use crate::orchestrator::{
    confined_join, BatchOrchestrator, BatchReport, ExtensionFilter, FileSet, OutputTarget,
    ProcessMode,
};
use crate::registry::FileIdentityRegistry;
use crate::report::write_failure_log;

/// One stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeRecord {
    /// Storage key relative to the upload directory
    pub working_key: String,
    /// Relative path as supplied by the user
    pub original_name: String,
    /// Folder part of `original_name`, if any
    pub folder: Option<String>,
    pub has_lyrics: bool,
    pub original_lyrics: Option<String>,
    /// Set when the lyrics could not be read
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FolderStats {
    pub total: usize,
    pub with_lyrics: usize,
}

/// Result of a multi-file upload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntakeSummary {
    pub files: Vec<IntakeRecord>,
    /// Per original folder; the root folder is the empty string
    pub folder_structure: BTreeMap<String, FolderStats>,
    pub warnings: Vec<String>,
}

impl IntakeSummary {
    pub fn total_files(&self) -> usize {
        self.files.len()
    }

    pub fn files_with_lyrics(&self) -> usize {
        self.files.iter().filter(|f| f.has_lyrics).count()
    }
}

/// What cleaning a file would change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricsPreview {
    pub original: String,
    pub cleaned: String,
    pub removed: Vec<String>,
    pub removed_count: usize,
}

/// Per-call options for [`CleanerSession::process`].
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub dry_run: bool,
    pub extension_filter: Option<ExtensionFilter>,
}

/// Upload session: intake, preview, processing and download naming.
pub struct CleanerSession {
    config: CleanerConfig,
    registry: Arc<FileIdentityRegistry>,
    store: Arc<dyn LyricsStore>,
    sanitizer: Arc<LyricsSanitizer>,
    orchestrator: BatchOrchestrator,
    event_bus: EventBus,
}

impl CleanerSession {
    /// Session backed by the `lofty` tag accessor.
    pub fn new(config: CleanerConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(TagAccessor::new()))
    }

    /// Session with a custom lyrics store.
    ///
    /// Validates `config` and creates the working directories.
    pub fn with_store(config: CleanerConfig, store: Arc<dyn LyricsStore>) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.upload_dir)?;
        std::fs::create_dir_all(&config.processed_dir)?;

        let sanitizer = Arc::new(match &config.header_keywords {
            Some(keywords) => LyricsSanitizer::with_keywords(HeaderKeywords::new(keywords.iter())),
            None => LyricsSanitizer::new(),
        });
        let event_bus = EventBus::default();
        let orchestrator = BatchOrchestrator::new(Arc::clone(&store), Arc::clone(&sanitizer))
            .with_max_concurrent(config.max_concurrent)
            .with_event_bus(event_bus.clone());

        info!(
            upload_dir = %config.upload_dir.display(),
            processed_dir = %config.processed_dir.display(),
            "Cleaner session ready"
        );

        Ok(Self {
            config,
            registry: Arc::new(FileIdentityRegistry::new()),
            store,
            sanitizer,
            orchestrator,
            event_bus,
        })
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    pub fn registry(&self) -> &FileIdentityRegistry {
        &self.registry
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Stores one uploaded file under a fresh working key.
    ///
    /// Folder components and the file name are sanitized for storage; the
    /// supplied path is kept verbatim as the original name.
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidInput` for unsupported extensions or names that
    ///   sanitize to nothing
    /// - `CoreError::Io` if the file cannot be stored
    ///
    /// Unreadable lyrics are reported in [`IntakeRecord::warning`].
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn intake(&self, original_name: &str, bytes: Vec<u8>) -> Result<IntakeRecord> {
        let normalized = original_name.replace('\\', "/");
        let (folder, basename) = match normalized.rsplit_once('/') {
            Some((folder, basename)) => (Some(folder), basename),
            None => (None, normalized.as_str()),
        };

        if !is_supported_audio_file(Path::new(basename)) {
            return Err(CoreError::InvalidInput(format!(
                "Unsupported file type: {}",
                original_name
            )));
        }
        let safe_name = sanitize_component(basename);
        if safe_name.is_empty() || !is_supported_audio_file(Path::new(&safe_name)) {
            return Err(CoreError::InvalidInput(format!(
                "Invalid file name: {}",
                original_name
            )));
        }

        let safe_folder: Vec<String> = folder
            .into_iter()
            .flat_map(|f| f.split('/'))
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .map(sanitize_component)
            .filter(|part| !part.is_empty())
            .collect();
        let relative = if safe_folder.is_empty() {
            safe_name
        } else {
            format!("{}/{}", safe_folder.join("/"), safe_name)
        };

        let working_key = self.registry.allocate(&relative, original_name);
        let path = self.config.upload_dir.join(&working_key);
        if let Err(e) = store_bytes(&path, bytes).await {
            self.registry.remove(&working_key);
            return Err(e.into());
        }

        let (original_lyrics, warning) = match self.read_lyrics(path).await {
            Ok(lyrics) => (lyrics, None),
            Err(e) => {
                warn!(working_key = %working_key, error = %e, "Could not read lyrics of upload");
                (None, Some(format!("{}: {}", original_name, e)))
            }
        };
        let has_lyrics = original_lyrics.is_some();

        debug!(working_key = %working_key, has_lyrics, "Stored upload");
        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::FileIngested {
                working_key: working_key.clone(),
                original_name: original_name.to_string(),
                has_lyrics,
            }));

        Ok(IntakeRecord {
            working_key,
            original_name: original_name.to_string(),
            folder: folder.filter(|f| !f.is_empty()).map(str::to_string),
            has_lyrics,
            original_lyrics,
            warning,
        })
    }

    /// Stores several uploads; rejected items become warnings.
    ///
    /// # Errors
    ///
    /// `CoreError::EmptyFileList` when `items` is empty.
    pub async fn intake_batch<I>(&self, items: I) -> Result<IntakeSummary>
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut summary = IntakeSummary::default();
        let mut seen = 0usize;

        for (original_name, bytes) in items {
            seen += 1;
            match self.intake(&original_name, bytes).await {
                Ok(record) => {
                    let stats = summary
                        .folder_structure
                        .entry(record.folder.clone().unwrap_or_default())
                        .or_default();
                    stats.total += 1;
                    if record.has_lyrics {
                        stats.with_lyrics += 1;
                    }
                    if let Some(warning) = &record.warning {
                        summary.warnings.push(warning.clone());
                    }
                    summary.files.push(record);
                }
                Err(e) => summary.warnings.push(format!("{}: {}", original_name, e)),
            }
        }

        if seen == 0 {
            return Err(CoreError::EmptyFileList);
        }

        info!(
            stored = summary.files.len(),
            with_lyrics = summary.files_with_lyrics(),
            warnings = summary.warnings.len(),
            "Intake batch finished"
        );
        Ok(summary)
    }

    /// Shows what cleaning `working_key` would remove. Writes nothing.
    ///
    /// Returns `Ok(None)` when the file carries no lyrics.
    pub async fn preview(&self, working_key: &str) -> Result<Option<LyricsPreview>> {
        let path = confined_join(&self.config.upload_dir, working_key).ok_or_else(|| {
            CoreError::InvalidInput(format!("Invalid working key: {}", working_key))
        })?;
        if !path.is_file() {
            return Err(CoreError::NotFound(working_key.to_string()));
        }

        let Some(original) = self.read_lyrics(path).await? else {
            return Ok(None);
        };
        let sanitized = self.sanitizer.sanitize(&original);

        Ok(Some(LyricsPreview {
            removed_count: sanitized.removed_count(),
            original,
            cleaned: sanitized.cleaned,
            removed: sanitized.removed_lines,
        }))
    }

    /// Cleans the given uploads into `processed_dir/<prefix><working key>`.
    ///
    /// Uploads themselves are left untouched.
    pub async fn process(&self, keys: Vec<String>, options: ProcessOptions) -> Result<BatchReport> {
        let mode = ProcessMode::default()
            .with_dry_run(options.dry_run)
            .with_extension_filter(options.extension_filter)
            .with_output(OutputTarget::CopyTo {
                root: self.config.processed_dir.clone(),
                prefix: self.config.processed_prefix.clone(),
            });

        self.orchestrator
            .run(
                FileSet::List {
                    root: self.config.upload_dir.clone(),
                    keys,
                },
                &mode,
            )
            .await
    }

    /// File name to offer when downloading `processed_key`.
    pub fn download_name(&self, processed_key: &str) -> String {
        let original = match processed_key.strip_prefix(self.config.processed_prefix.as_str()) {
            Some(working_key) => self.registry.resolve_original(working_key),
            None => processed_key.to_string(),
        };
        basename(&original).to_string()
    }

    /// Relative path for `processed_key` inside a download archive.
    pub fn archive_name(&self, processed_key: &str) -> String {
        match processed_key.strip_prefix(self.config.processed_prefix.as_str()) {
            Some(working_key) => self.registry.resolve_original_path(working_key),
            None => processed_key.to_string(),
        }
    }

    /// Exports the failed files of `report` into `failure_log_dir`.
    pub fn export_failure_log(&self, report: &BatchReport) -> Result<Option<PathBuf>> {
        write_failure_log(&self.config.failure_log_dir, report, &self.registry)
    }

    /// Forgets every upload and empties both working directories.
    ///
    /// Returns the number of registry entries dropped. Entries that cannot be
    /// deleted are logged and left behind.
    pub async fn cleanup(&self) -> Result<usize> {
        let entries_removed = self.registry.clear();
        let upload = empty_dir(&self.config.upload_dir).await?;
        let processed = empty_dir(&self.config.processed_dir).await?;

        info!(
            entries_removed,
            removed_paths = upload + processed,
            "Session cleaned up"
        );
        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::Cleared { entries_removed }));
        Ok(entries_removed)
    }

    async fn read_lyrics(&self, path: PathBuf) -> Result<Option<String>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.read_lyrics(&path))
            .await
            .map_err(|e| CoreError::Runtime(core_runtime::Error::Internal(e.to_string())))?
            .map_err(CoreError::from)
    }
}

/// Keeps letters, digits and `-_.`; whitespace becomes `_`.
fn sanitize_component(part: &str) -> String {
    let mapped: String = part
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();
    mapped.trim_matches(|c| c == '.' || c == '_').to_string()
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

async fn store_bytes(path: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

/// Removes everything inside `dir`, keeping `dir` itself.
async fn empty_dir(dir: &Path) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let result = match entry.file_type().await {
            Ok(kind) if kind.is_dir() => tokio::fs::remove_dir_all(&path).await,
            Ok(_) => tokio::fs::remove_file(&path).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => warn!(
                path = %strip_path(&path.to_string_lossy()),
                error = %e,
                "Failed to remove working file"
            ),
        }
    }
    Ok(removed)
}

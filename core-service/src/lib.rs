//! Batch pipeline and session façade for the lyrics cleaner.
//!
//! This crate wires the metadata building blocks from `core-metadata` into
//! the operations a host shell performs:
//!
//! - [`orchestrator`] runs read → sanitize → backup → write over a single
//!   file, a directory tree or an explicit list, with bounded concurrency
//! - [`registry`] maps generated working keys back to original file names
//! - [`report`] renders and exports failure logs
//! - [`session`] ties these together for upload based shells: intake,
//!   preview, processing, download naming and cleanup

pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod session;

pub use error::{CoreError, Result};
pub use orchestrator::{
    survey, BatchOrchestrator, BatchReport, DirectoryStats, ExtensionFilter, FailedFile,
    FailureKind, FileReport, FileSet, OutputTarget, ProcessMode, ProcessOutcome,
};
pub use registry::{strip_working_prefix, FileIdentityRegistry};
pub use report::{render_failure_log, write_failure_log};
pub use session::{
    CleanerSession, FolderStats, IntakeRecord, IntakeSummary, LyricsPreview, ProcessOptions,
};

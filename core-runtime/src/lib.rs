//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the lyrics cleaner core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the metadata and service
//! crates depend on. It establishes the logging conventions, the validated
//! configuration shape, and the event broadcasting used to report batch
//! progress to host shells.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CleanerConfig, CleanerConfigBuilder};
pub use error::{Error, Result};

//! # Cleaner Configuration Module
//!
//! Provides configuration management for the lyrics cleaner core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `CleanerConfig` instance holding the working directories and processing
//! defaults. It enforces fail-fast validation so a host shell learns about a
//! missing directory or a nonsensical worker count before the first upload
//! arrives.
//!
//! ## Required Settings
//!
//! - `upload_dir` - Working storage root where intake writes uploaded files
//! - `processed_dir` - Root where cleaned copies are written
//!
//! ## Optional Settings (with defaults)
//!
//! - `failure_log_dir` - Where failure logs are exported (default: `upload_dir`)
//! - `header_keywords` - Replaces the built-in header keyword list
//! - `max_concurrent` - Worker pool bound for batch runs (default: 4)
//! - `processed_prefix` - Marker prepended to processed file names (default: `cleaned_`)
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CleanerConfig;
//!
//! let config = CleanerConfig::builder()
//!     .upload_dir("/tmp/uploads")
//!     .processed_dir("/tmp/processed")
//!     .max_concurrent(8)
//!     .build()
//!     .expect("Failed to build config");
//!
//! assert_eq!(config.failure_log_dir, config.upload_dir);
//! ```
//!
//! ## Error Handling
//!
//! The builder provides actionable error messages when required settings are
//! missing:
//!
//! ```should_panic
//! use core_runtime::config::CleanerConfig;
//!
//! let config = CleanerConfig::builder()
//!     .upload_dir("/tmp/uploads")
//!     .build()
//!     .expect("Should fail - missing processed_dir");
//! ```

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Default worker pool bound for batch runs.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Upper bound accepted for `max_concurrent`.
pub const MAX_CONCURRENT_LIMIT: usize = 64;

/// Default marker prepended to processed file names.
pub const DEFAULT_PROCESSED_PREFIX: &str = "cleaned_";

/// Validated configuration for a cleaner session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanerConfig {
    /// Working storage root for uploaded files
    pub upload_dir: PathBuf,
    /// Root for processed copies
    pub processed_dir: PathBuf,
    /// Directory that receives exported failure logs
    pub failure_log_dir: PathBuf,
    /// Replacement header keyword list; `None` keeps the built-in list
    pub header_keywords: Option<Vec<String>>,
    /// Maximum number of files processed at once
    pub max_concurrent: usize,
    /// Marker prepended to processed file names
    pub processed_prefix: String,
}

impl CleanerConfig {
    /// Creates a new builder for constructing a `CleanerConfig`.
    pub fn builder() -> CleanerConfigBuilder {
        CleanerConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Directory paths are not empty
    /// - `max_concurrent` is within 1..=64
    /// - A keyword override, if present, is non-empty and has no blank entries
    /// - The processed prefix is non-empty
    pub fn validate(&self) -> Result<()> {
        if self.upload_dir.as_os_str().is_empty() {
            return Err(Error::Config("Upload directory cannot be empty".to_string()));
        }

        if self.processed_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Processed directory cannot be empty".to_string(),
            ));
        }

        if self.failure_log_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Failure log directory cannot be empty".to_string(),
            ));
        }

        if self.max_concurrent == 0 {
            return Err(Error::Config(
                "max_concurrent must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent > MAX_CONCURRENT_LIMIT {
            return Err(Error::Config(format!(
                "max_concurrent exceeds maximum of {}",
                MAX_CONCURRENT_LIMIT
            )));
        }

        if let Some(keywords) = &self.header_keywords {
            if keywords.is_empty() {
                return Err(Error::Config(
                    "Header keyword override is empty. \
                     Omit .header_keywords() to use the built-in list."
                        .to_string(),
                ));
            }

            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(Error::Config(
                    "Header keywords cannot contain blank entries".to_string(),
                ));
            }
        }

        if self.processed_prefix.is_empty() {
            return Err(Error::Config(
                "Processed prefix cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`CleanerConfig`] instances.
///
/// Call [`build()`](CleanerConfigBuilder::build) once the required
/// directories are set.
#[derive(Debug, Default)]
pub struct CleanerConfigBuilder {
    upload_dir: Option<PathBuf>,
    processed_dir: Option<PathBuf>,
    failure_log_dir: Option<PathBuf>,
    header_keywords: Option<Vec<String>>,
    max_concurrent: Option<usize>,
    processed_prefix: Option<String>,
}

impl CleanerConfigBuilder {
    /// Sets the working storage root for uploaded files.
    pub fn upload_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.upload_dir = Some(path.into());
        self
    }

    /// Sets the root for processed copies.
    pub fn processed_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.processed_dir = Some(path.into());
        self
    }

    /// Sets the directory that receives exported failure logs.
    pub fn failure_log_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.failure_log_dir = Some(path.into());
        self
    }

    /// Replaces the built-in header keyword list.
    pub fn header_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header_keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the worker pool bound for batch runs.
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = Some(max);
        self
    }

    /// Sets the marker prepended to processed file names.
    pub fn processed_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.processed_prefix = Some(prefix.into());
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a required directory is missing or a
    /// setting fails [`CleanerConfig::validate`].
    pub fn build(self) -> Result<CleanerConfig> {
        let upload_dir = self.upload_dir.ok_or_else(|| {
            Error::Config("Upload directory is required. Use .upload_dir() to set it.".to_string())
        })?;

        let processed_dir = self.processed_dir.ok_or_else(|| {
            Error::Config(
                "Processed directory is required. Use .processed_dir() to set it.".to_string(),
            )
        })?;

        let config = CleanerConfig {
            failure_log_dir: self.failure_log_dir.unwrap_or_else(|| upload_dir.clone()),
            upload_dir,
            processed_dir,
            header_keywords: self.header_keywords,
            max_concurrent: self.max_concurrent.unwrap_or(DEFAULT_MAX_CONCURRENT),
            processed_prefix: self
                .processed_prefix
                .unwrap_or_else(|| DEFAULT_PROCESSED_PREFIX.to_string()),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> CleanerConfigBuilder {
        CleanerConfig::builder()
            .upload_dir("/tmp/uploads")
            .processed_dir("/tmp/processed")
    }

    #[test]
    fn test_builder_requires_upload_dir() {
        let result = CleanerConfig::builder()
            .processed_dir("/tmp/processed")
            .build();

        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Upload directory is required"));
        assert!(err.contains(".upload_dir()"));
    }

    #[test]
    fn test_builder_requires_processed_dir() {
        let result = CleanerConfig::builder().upload_dir("/tmp/uploads").build();

        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Processed directory is required"));
    }

    #[test]
    fn test_builder_defaults() {
        let config = base_builder().build().unwrap();

        assert_eq!(config.upload_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.processed_dir, PathBuf::from("/tmp/processed"));
        assert_eq!(config.failure_log_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.processed_prefix, "cleaned_");
        assert!(config.header_keywords.is_none());
    }

    #[test]
    fn test_builder_with_all_settings() {
        let config = base_builder()
            .failure_log_dir("/tmp/logs")
            .header_keywords(["作词", "作曲"])
            .max_concurrent(2)
            .processed_prefix("clean-")
            .build()
            .unwrap();

        assert_eq!(config.failure_log_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(
            config.header_keywords,
            Some(vec!["作词".to_string(), "作曲".to_string()])
        );
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.processed_prefix, "clean-");
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let result = base_builder().max_concurrent(0).build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be greater than 0"));
    }

    #[test]
    fn test_validate_rejects_excessive_workers() {
        let result = base_builder().max_concurrent(MAX_CONCURRENT_LIMIT + 1).build();
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_rejects_empty_keyword_override() {
        let result = base_builder().header_keywords(Vec::<String>::new()).build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Header keyword override is empty"));
    }

    #[test]
    fn test_validate_rejects_blank_keyword() {
        let result = base_builder().header_keywords(["作词", "  "]).build();
        assert!(result.unwrap_err().to_string().contains("blank entries"));
    }

    #[test]
    fn test_validate_rejects_empty_paths() {
        let result = CleanerConfig::builder()
            .upload_dir("")
            .processed_dir("/tmp/processed")
            .build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Upload directory cannot be empty"));
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let result = base_builder().processed_prefix("").build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Processed prefix cannot be empty"));
    }
}

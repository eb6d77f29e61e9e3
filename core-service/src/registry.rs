//! File identity registry.
//!
//! Uploaded files are stored under a generated working key so two uploads
//! named `song.mp3` never clash. The registry maps every working key back to
//! the name the user supplied, for display, failure export and download.
//!
//! Working keys look like `folder/20240101_120000_song.mp3`. When a key is
//! already taken, counter digits are appended to the time group
//! (`20240101_1200001_song.mp3`), which keeps the `digits_digits_` shape the
//! lookup fallback relies on.

use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

static WORKING_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+_\d+_").expect("valid working prefix regex"));

const KEY_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Session-scoped mapping from working keys to original names.
#[derive(Debug, Default)]
pub struct FileIdentityRegistry {
    entries: RwLock<HashMap<String, String>>,
}

impl FileIdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites an entry; returns the previous original name.
    pub fn register(
        &self,
        working_key: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Option<String> {
        self.entries
            .write()
            .insert(working_key.into(), original_name.into())
    }

    /// Generates a fresh working key for `relative_path` and registers it.
    ///
    /// `relative_path` is the already sanitized `/`-separated storage path;
    /// `original_name` is what the user supplied.
    pub fn allocate(&self, relative_path: &str, original_name: &str) -> String {
        self.allocate_at(relative_path, original_name, Local::now().naive_local())
    }

    /// [`allocate`](Self::allocate) with an explicit clock reading.
    pub fn allocate_at(
        &self,
        relative_path: &str,
        original_name: &str,
        now: NaiveDateTime,
    ) -> String {
        let (folder, basename) = split_relative(relative_path);
        let stamp = now.format(KEY_TIME_FORMAT).to_string();

        let mut entries = self.entries.write();
        let mut counter = 0usize;
        let key = loop {
            let prefix = if counter == 0 {
                stamp.clone()
            } else {
                format!("{}{}", stamp, counter)
            };
            let candidate = match folder {
                Some(folder) => format!("{}/{}_{}", folder, prefix, basename),
                None => format!("{}_{}", prefix, basename),
            };
            if !entries.contains_key(&candidate) {
                break candidate;
            }
            counter += 1;
        };

        entries.insert(key.clone(), original_name.to_string());
        debug!(working_key = %key, original = %original_name, "Registered working key");
        key
    }

    /// Original name for `working_key`.
    ///
    /// Falls back to the key's basename with any `digits_digits_` prefix
    /// removed when the key was never registered.
    pub fn resolve_original(&self, working_key: &str) -> String {
        if let Some(original) = self.entries.read().get(working_key) {
            return original.clone();
        }
        let (_, basename) = split_relative(working_key);
        strip_working_prefix(basename).to_string()
    }

    /// Original relative path for `working_key`, used for archive entries.
    ///
    /// On a miss the folder part of the key is kept and only the basename is
    /// reverted.
    pub fn resolve_original_path(&self, working_key: &str) -> String {
        if let Some(original) = self.entries.read().get(working_key) {
            return original.clone();
        }
        match split_relative(working_key) {
            (Some(folder), basename) => {
                format!("{}/{}", folder, strip_working_prefix(basename))
            }
            (None, basename) => strip_working_prefix(basename).to_string(),
        }
    }

    pub fn remove(&self, working_key: &str) -> Option<String> {
        self.entries.write().remove(working_key)
    }

    pub fn lookup(&self, working_key: &str) -> Option<String> {
        self.entries.read().get(working_key).cloned()
    }

    pub fn contains(&self, working_key: &str) -> bool {
        self.entries.read().contains_key(working_key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every entry and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        count
    }
}

/// Removes a leading `digits_digits_` working prefix, if any.
pub fn strip_working_prefix(name: &str) -> &str {
    match WORKING_PREFIX.find(name) {
        Some(prefix) => &name[prefix.end()..],
        None => name,
    }
}

/// Splits a key on its last separator into (folder, basename).
fn split_relative(path: &str) -> (Option<&str>, &str) {
    match path.rfind(['/', '\\']) {
        Some(idx) => (Some(&path[..idx]).filter(|f| !f.is_empty()), &path[idx + 1..]),
        None => (None, path),
    }
}

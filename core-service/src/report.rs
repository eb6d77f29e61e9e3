//! Plain-text failure log export.

use chrono::{Local, NaiveDateTime};
use core_runtime::logging::strip_path;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::orchestrator::BatchReport;
use crate::registry::FileIdentityRegistry;

const RULE_WIDTH: usize = 50;

/// Renders the failed files of `report` with their original names.
pub fn render_failure_log(
    report: &BatchReport,
    registry: &FileIdentityRegistry,
    exported_at: NaiveDateTime,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str("MusicMetaCleaner - Failed Files\n");
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!(
        "Exported at: {}\n",
        exported_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Total failed: {}\n", report.failed_files.len()));
    out.push_str(&rule);
    out.push_str("\n\n");

    for (index, failed) in report.failed_files.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}: {}\n",
            index + 1,
            registry.resolve_original(&failed.file),
            failed.reason
        ));
    }

    out.push('\n');
    out.push_str(&rule);
    out.push_str("\nExport complete\n");
    out
}

/// Writes `failed_files_<timestamp>.txt` into `dir`.
///
/// Returns `Ok(None)` without touching the filesystem when nothing failed.
pub fn write_failure_log(
    dir: &Path,
    report: &BatchReport,
    registry: &FileIdentityRegistry,
) -> Result<Option<PathBuf>> {
    if !report.has_failures() {
        return Ok(None);
    }

    let now = Local::now().naive_local();
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("failed_files_{}.txt", now.format("%Y%m%d_%H%M%S")));
    fs::write(&path, render_failure_log(report, registry, now))?;

    info!(
        file = %strip_path(&path.to_string_lossy()),
        failed = report.failed_files.len(),
        "Exported failure log"
    );
    Ok(Some(path))
}

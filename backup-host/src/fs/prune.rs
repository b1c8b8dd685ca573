//! Age-based retention for a host's backup directories.

use crate::utils::{BackupError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

const SECONDS_PER_DAY: u64 = 86_400;

/// A directory removed by [`prune_old_backups`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedBackup {
    pub path: PathBuf,
    pub age_days: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub removed: Vec<RemovedBackup>,
    pub kept: usize,
}

/// Whole days between `modified` and `now`; a future mtime counts as zero
pub fn age_in_days(modified: SystemTime, now: SystemTime) -> u64 {
    now.duration_since(modified)
        .unwrap_or(Duration::ZERO)
        .as_secs()
        / SECONDS_PER_DAY
}

/// Permanently delete every `<host>-*` directory directly under `host_dir`
/// whose age exceeds `retention_days`.
///
/// Files, symlinks and entries without the host prefix are never touched.
/// A missing `host_dir` is not an error.
pub fn prune_old_backups(
    host_dir: &Path,
    host: &str,
    retention_days: u64,
    now: SystemTime,
) -> Result<PruneReport> {
    let mut report = PruneReport::default();
    if !host_dir.exists() {
        debug!("No backup directory at {}, nothing to prune", host_dir.display());
        return Ok(report);
    }

    let prefix = format!("{host}-");
    let mut candidates = Vec::new();

    for entry in fs::read_dir(host_dir).map_err(|e| BackupError::at(host_dir, e))? {
        let entry = entry.map_err(|e| BackupError::at(host_dir, e))?;
        if !entry.file_name().to_string_lossy().starts_with(&prefix) {
            continue;
        }
        let path = entry.path();
        let metadata = fs::symlink_metadata(&path).map_err(|e| BackupError::at(&path, e))?;
        if !metadata.is_dir() {
            continue;
        }
        let modified = metadata.modified().map_err(|e| BackupError::at(&path, e))?;
        candidates.push((path, age_in_days(modified, now)));
    }

    candidates.sort();

    for (path, age_days) in candidates {
        if age_days > retention_days {
            info!("Removing old backup: {} (Age: {} days)", path.display(), age_days);
            fs::remove_dir_all(&path).map_err(|e| BackupError::at(&path, e))?;
            report.removed.push(RemovedBackup { path, age_days });
        } else {
            report.kept += 1;
        }
    }

    Ok(report)
}

//! Seeding a new period's directory from the previous period.
//!
//! The copy lands in a staging directory that is renamed into place once the
//! walk finishes, so an interrupted seed never looks like a finished period
//! directory. Individual entries that fail to copy are logged and skipped:
//! the rsync pass that follows reconciles whatever is missing.

use crate::fs::metadata::{set_modified, EntryMetadata};
use crate::rotation::{BackupLayout, Period, SeedSource};
use crate::utils::{BackupError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Counters from one seed copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub files: usize,
    pub dirs: usize,
    pub symlinks: usize,
    pub bytes: u64,
    /// Sockets, fifos and device nodes; rsync recreates these
    pub skipped: usize,
    pub failed: usize,
}

/// What happened to the current period's directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Directory was already there; nothing copied
    AlreadyExists,
    /// Copied from an earlier period
    Seeded { source: SeedSource, stats: SeedStats },
    /// No earlier period within the attempt bound; created empty
    CreatedEmpty,
}

/// Make sure the directory for `current` exists, seeding it from the nearest
/// earlier period when it does not.
pub fn seed_current_period(
    layout: &BackupLayout,
    current: &Period,
    attempts: u32,
) -> Result<SeedOutcome> {
    let target = layout.dir_for(current);
    if target.exists() {
        debug!("Backup directory already exists: {}", target.display());
        return Ok(SeedOutcome::AlreadyExists);
    }

    fs::create_dir_all(layout.host_dir()).map_err(|e| BackupError::at(layout.host_dir(), e))?;

    let Some(source) = layout.find_seed(current, attempts) else {
        info!(
            "No earlier backup within {} periods, creating empty {}",
            attempts,
            target.display()
        );
        fs::create_dir(&target).map_err(|e| BackupError::at(&target, e))?;
        return Ok(SeedOutcome::CreatedEmpty);
    };

    info!(
        "Seeding {} from {}",
        target.display(),
        source.path.display()
    );

    let staging = staging_path(&target);
    if staging.exists() {
        warn!("Removing leftover staging directory {}", staging.display());
        fs::remove_dir_all(&staging).map_err(|e| BackupError::at(&staging, e))?;
    }

    let stats = copy_tree(&source.path, &staging)?;
    fs::rename(&staging, &target).map_err(|e| BackupError::at(&target, e))?;

    info!(
        "Seed copy finished: {} files, {} dirs, {} symlinks, {} bytes ({} failed)",
        stats.files, stats.dirs, stats.symlinks, stats.bytes, stats.failed
    );

    Ok(SeedOutcome::Seeded { source, stats })
}

/// `.web01-W05-2025.seeding` next to the target. The leading dot keeps it
/// outside the host prefix the pruner matches on.
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.seeding"))
}

/// Recursively copy `src` into `dst`, preserving mtimes, modes and symlinks.
///
/// Only failure to create `dst` itself is an error.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<SeedStats> {
    fs::create_dir_all(dst).map_err(|e| BackupError::at(dst, e))?;

    let mut stats = SeedStats::default();
    // Directory times are applied last; creating children bumps them
    let mut dirs: Vec<(PathBuf, PathBuf)> = Vec::new();

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Seed walk error: {}", e);
                stats.failed += 1;
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        let file_type = entry.file_type();

        let result = if file_type.is_dir() {
            fs::create_dir_all(&target).map(|_| {
                stats.dirs += 1;
                dirs.push((entry.path().to_path_buf(), target.clone()));
            })
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target).map(|_| stats.symlinks += 1)
        } else if file_type.is_file() {
            copy_file(entry.path(), &target).map(|bytes| {
                stats.files += 1;
                stats.bytes += bytes;
            })
        } else {
            debug!("Skipping special file {}", entry.path().display());
            stats.skipped += 1;
            Ok(())
        };

        if let Err(e) = result {
            warn!("Failed to seed {}: {}", entry.path().display(), e);
            stats.failed += 1;
        }
    }

    for (source, target) in dirs.iter().rev() {
        if let Err(e) = EntryMetadata::from_path(source).and_then(|m| m.apply_to_path(target)) {
            warn!("Failed to restore directory metadata on {}: {}", target.display(), e);
        }
    }

    Ok(stats)
}

fn copy_file(src: &Path, dst: &Path) -> std::io::Result<u64> {
    let metadata = EntryMetadata::from_path(src)?;
    // fs::copy carries the mode bits over
    let bytes = fs::copy(src, dst)?;
    set_modified(dst, metadata.modified)?;
    Ok(bytes)
}

fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    let link_target = fs::read_link(src)?;
    std::os::unix::fs::symlink(link_target, dst)
}

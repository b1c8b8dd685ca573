//! Pid lock file guarding against overlapping runs for the same host.
//!
//! Two runs racing on the same host would fight over seeding and could prune
//! a directory the other one is writing.
//!
//! The pid file is written under a private name and hard-linked into place,
//! so the lock never exists without its pid. A stale lock is taken over by
//! renaming it to a private name first; if what was moved is no longer the
//! stale content, it is linked back.

use crate::utils::{BackupError, Result};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ACQUIRE_ATTEMPTS: usize = 3;

/// Held lock; the file is removed on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock at `path`, clearing it first if its owner is gone
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BackupError::at(parent, e))?;
        }

        let mut holder = 0;
        for _ in 0..ACQUIRE_ATTEMPTS {
            match publish(path) {
                Ok(()) => {
                    debug!("Acquired run lock {}", path.display());
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let text = match fs::read_to_string(path) {
                        Ok(text) => text,
                        Err(e) if e.kind() == ErrorKind::NotFound => continue,
                        Err(e) => return Err(BackupError::at(path, e)),
                    };
                    let pid = text.trim().parse::<i32>().ok();
                    if let Some(pid) = pid.filter(|pid| process_alive(*pid)) {
                        return Err(BackupError::Locked {
                            path: path.to_path_buf(),
                            pid,
                        });
                    }
                    holder = pid.unwrap_or(0);
                    warn!("Removing stale run lock {} (pid {})", path.display(), holder);
                    if !clear_stale(path, &text).map_err(|e| BackupError::at(path, e))? {
                        debug!("Run lock {} changed hands during takeover", path.display());
                    }
                }
                Err(e) => return Err(BackupError::at(path, e)),
            }
        }

        Err(BackupError::Locked {
            path: path.to_path_buf(),
            pid: holder,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let ours = fs::read_to_string(&self.path)
            .map(|text| text.trim() == std::process::id().to_string())
            .unwrap_or(false);
        if ours {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// `.run.lock.<suffix>` next to the lock
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{suffix}"))
}

/// Create the lock with our pid already in it; `AlreadyExists` if it is held
fn publish(path: &Path) -> std::io::Result<()> {
    let pid = std::process::id();
    let staged = sibling(path, &pid.to_string());
    fs::write(&staged, format!("{pid}\n"))?;
    let linked = fs::hard_link(&staged, path);
    let _ = fs::remove_file(&staged);
    linked
}

/// Remove the lock at `path` only if it still holds `expected`. Returns
/// false when the lock vanished or was replaced by another run.
fn clear_stale(path: &Path, expected: &str) -> std::io::Result<bool> {
    let moved = sibling(path, &format!("stale.{}", std::process::id()));
    match fs::rename(path, &moved) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }

    let current = fs::read_to_string(&moved)?;
    if current == expected {
        fs::remove_file(&moved)?;
        return Ok(true);
    }

    // Took a fresh lock by mistake; hand it back unless a third run got there first
    match fs::hard_link(&moved, path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e),
    }
    fs::remove_file(&moved)?;
    Ok(false)
}

/// Signal 0 probes for existence; EPERM still means the pid is in use
fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

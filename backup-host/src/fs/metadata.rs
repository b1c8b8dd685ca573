//! Timestamp and permission handling for copied backup entries.

use std::fs::{self, File};
use std::path::Path;
use std::time::SystemTime;

/// Metadata carried from a seed entry onto its copy
#[derive(Debug, Clone, Copy)]
pub struct EntryMetadata {
    /// Last modified time
    pub modified: SystemTime,

    /// Unix mode bits
    pub permissions: u32,
}

impl EntryMetadata {
    /// Read metadata without following symlinks
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::symlink_metadata(path)?;
        Ok(Self {
            modified: metadata.modified()?,
            permissions: metadata.permissions().mode(),
        })
    }

    /// Apply to a regular file or directory.
    ///
    /// The timestamp is set first: a restrictive mode could otherwise stop us
    /// from opening the entry again.
    pub fn apply_to_path(&self, path: &Path) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        set_modified(path, self.modified)?;
        fs::set_permissions(path, fs::Permissions::from_mode(self.permissions))?;
        Ok(())
    }
}

/// Set the modification time of a file or directory
pub fn set_modified(path: &Path, modified: SystemTime) -> std::io::Result<()> {
    File::open(path)?.set_modified(modified)
}

/// Mark a directory as written now
pub fn touch(path: &Path) -> std::io::Result<()> {
    set_modified(path, SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_apply_copies_mtime_and_mode() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("dst.txt");
        fs::write(&src, b"test content")?;
        fs::write(&dst, b"test content")?;

        let old = SystemTime::now() - Duration::from_secs(3 * 86_400);
        set_modified(&src, old)?;
        fs::set_permissions(&src, fs::Permissions::from_mode(0o640))?;

        EntryMetadata::from_path(&src)?.apply_to_path(&dst)?;

        let meta = fs::metadata(&dst)?;
        assert_eq!(meta.permissions().mode() & 0o777, 0o640);
        let drift = meta
            .modified()?
            .duration_since(old)
            .unwrap_or_else(|e| e.duration());
        assert!(drift < Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn test_touch_directory() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path().join("d");
        fs::create_dir(&dir)?;
        set_modified(&dir, SystemTime::now() - Duration::from_secs(30 * 86_400))?;

        touch(&dir)?;

        let age = SystemTime::now()
            .duration_since(fs::metadata(&dir)?.modified()?)
            .unwrap_or_default();
        assert!(age < Duration::from_secs(60));
        Ok(())
    }
}

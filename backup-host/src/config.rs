//! Configuration management for the backup job.
//!
//! Loads configuration from a TOML file. Every field has a default so the job
//! runs with no configuration file and no arguments at all.

use crate::rotation::Rotation;
use crate::utils::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location probed when no `--config` is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/backup-host.toml";

/// Lock file name, placed inside the per-host backup directory
const LOCK_FILE_NAME: &str = ".backup-host.lock";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backup: BackupConfig,
    pub rsync: RsyncConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Host identifier used for directory and log names
    pub host: String,

    /// Base directory; backups land in `<base_dir>/<host>/`
    pub base_dir: PathBuf,

    /// Period length for one backup directory
    pub rotation: Rotation,

    /// How many earlier periods to probe for a seed directory
    pub seed_attempts: u32,

    /// Directories older than this many days are deleted
    pub retention_days: u64,

    /// rsync exclusion globs, matched against absolute paths
    pub excludes: Vec<String>,

    /// Refuse to run while another run holds the lock file
    pub lock: bool,

    /// Lock file override (default: `<base_dir>/<host>/.backup-host.lock`)
    pub lock_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsyncConfig {
    /// rsync executable
    pub binary: String,

    /// Tree to back up
    pub source: String,

    /// Preserve ACLs (-A)
    pub preserve_acls: bool,

    /// Preserve extended attributes (-X). Off by default because many
    /// backup targets (NFS, exfat) reject them.
    pub preserve_xattrs: bool,

    /// Extra arguments inserted before the source path
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Write the per-host log file
    pub to_file: bool,

    /// Log file override (default: `/var/log/backup_<host>.log`)
    pub file: Option<PathBuf>,

    /// Log each distinct directory rsync reports while transferring
    pub log_paths: bool,
}

// Default values
fn default_host() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

fn default_excludes() -> Vec<String> {
    [
        "/disk01",
        "/proc/*",
        "/sys/*",
        "/dev/*",
        "/run/*",
        "/mnt/*",
        "/media/*",
        "/lost+found",
        "/tmp/*",
        "/var/tmp/*",
        "/swapfile",
        "/afs",
        "/var/cache/*",
        "/var/log/*",
        "/home/*/.cache",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            base_dir: PathBuf::from("/disk01/backups"),
            rotation: Rotation::Weekly,
            seed_attempts: 10,
            retention_days: 7,
            excludes: default_excludes(),
            lock: true,
            lock_file: None,
        }
    }
}

impl Default for RsyncConfig {
    fn default() -> Self {
        Self {
            binary: "rsync".to_string(),
            source: "/".to_string(),
            preserve_acls: true,
            preserve_xattrs: false,
            extra_args: Vec::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: true,
            file: None,
            log_paths: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backup: BackupConfig::default(),
            rsync: RsyncConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BackupError::at(path, e))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load an explicit file, else the system file if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let system = Path::new(DEFAULT_CONFIG_PATH);
                if system.exists() {
                    Self::from_file(system)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let host = &self.backup.host;
        if host.is_empty() {
            return Err(BackupError::Config("host must not be empty".into()));
        }
        if host.contains('/') || host == "." || host == ".." {
            return Err(BackupError::Config(format!("invalid host name: {host}")));
        }
        if !self.backup.base_dir.is_absolute() {
            return Err(BackupError::Config(format!(
                "base_dir must be absolute: {}",
                self.backup.base_dir.display()
            )));
        }
        if self.rsync.binary.is_empty() {
            return Err(BackupError::Config("rsync.binary must not be empty".into()));
        }
        if self.rsync.source.is_empty() {
            return Err(BackupError::Config("rsync.source must not be empty".into()));
        }
        Ok(())
    }

    /// `<base_dir>/<host>`
    pub fn host_dir(&self) -> PathBuf {
        self.backup.base_dir.join(&self.backup.host)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.backup
            .lock_file
            .clone()
            .unwrap_or_else(|| self.host_dir().join(LOCK_FILE_NAME))
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        if !self.log.to_file {
            return None;
        }
        Some(self.log.file.clone().unwrap_or_else(|| {
            PathBuf::from(format!("/var/log/backup_{}.log", self.backup.host))
        }))
    }

    /// Configured excludes plus the backup base directory itself
    pub fn exclude_patterns(&self) -> Vec<String> {
        let mut patterns = self.backup.excludes.clone();
        let base = self.backup.base_dir.to_string_lossy().to_string();
        if !patterns.contains(&base) {
            patterns.push(base);
        }
        patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backup.retention_days, 7);
        assert_eq!(config.backup.seed_attempts, 10);
        assert_eq!(config.backup.rotation, Rotation::Weekly);
        assert_eq!(config.rsync.binary, "rsync");
        assert_eq!(config.rsync.source, "/");
        assert!(config.backup.excludes.contains(&"/proc/*".to_string()));
        assert!(!config.backup.host.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backup]
            host = "web01"
            base_dir = "/srv/backups"
            rotation = "daily"

            [log]
            log_paths = false
            "#,
        )
        .unwrap();

        assert_eq!(config.backup.host, "web01");
        assert_eq!(config.backup.rotation, Rotation::Daily);
        assert_eq!(config.backup.retention_days, 7);
        assert!(!config.log.log_paths);
        assert_eq!(config.log.level, "info");
        assert!(config.rsync.preserve_acls);
    }

    #[test]
    fn test_derived_paths() {
        let mut config = Config::default();
        config.backup.host = "web01".to_string();
        config.backup.base_dir = PathBuf::from("/srv/backups");

        assert_eq!(config.host_dir(), PathBuf::from("/srv/backups/web01"));
        assert_eq!(
            config.lock_path(),
            PathBuf::from("/srv/backups/web01/.backup-host.lock")
        );
        assert_eq!(
            config.log_file(),
            Some(PathBuf::from("/var/log/backup_web01.log"))
        );

        config.log.to_file = false;
        assert_eq!(config.log_file(), None);
    }

    #[test]
    fn test_exclude_patterns_include_base_once() {
        let mut config = Config::default();
        config.backup.base_dir = PathBuf::from("/srv/backups");
        let patterns = config.exclude_patterns();
        assert_eq!(patterns.last().map(String::as_str), Some("/srv/backups"));

        config.backup.excludes.push("/srv/backups".to_string());
        let patterns = config.exclude_patterns();
        assert_eq!(patterns.iter().filter(|p| *p == "/srv/backups").count(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_host_and_relative_base() {
        let mut config = Config::default();
        config.backup.host = "a/b".to_string();
        assert!(config.validate().is_err());

        config.backup.host = "web01".to_string();
        config.backup.base_dir = PathBuf::from("relative/backups");
        assert!(config.validate().is_err());

        config.backup.base_dir = PathBuf::from("/srv/backups");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_missing_reports_path() {
        let err = Config::from_file(Path::new("/nonexistent/backup-host.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/backup-host.toml"));
    }
}

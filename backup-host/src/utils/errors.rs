//! Custom error types for the backup job.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error at {path}: {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Another backup run holds the lock {path} (pid {pid})")]
    Locked { path: PathBuf, pid: i32 },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BackupError {
    /// Wrap an I/O error with the path it happened on
    pub fn at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::PathIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

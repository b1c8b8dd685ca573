//! Backup Host Library
//!
//! Weekly (or daily) rsync snapshots of the local host into
//! `<base_dir>/<host>/<host>-<period>`, seeded from the previous period and
//! pruned by age.

pub mod config;
pub mod executor;
pub mod fs;
pub mod rotation;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::{BackupJob, JobReport};
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;

//! Utility modules for the backup job.

pub mod errors;
pub mod logger;

pub use errors::{BackupError, Result};

//! File system operations on backup directories.

pub mod lock;
pub mod metadata;
pub mod prune;
pub mod seed;

pub use lock::RunLock;
pub use prune::{prune_old_backups, PruneReport};
pub use seed::{seed_current_period, SeedOutcome, SeedStats};

//! Backup job executor - runs one complete backup for the local host.
//!
//! The sequence is lock, seed, transfer, stamp, prune. A failed or
//! unlaunchable rsync is logged and the job still prunes; filesystem errors
//! while seeding or pruning abort the job.

use crate::config::Config;
use crate::fs::metadata::touch;
use crate::fs::{prune_old_backups, seed_current_period, PruneReport, RunLock, SeedOutcome};
use crate::rotation::{BackupLayout, Period};
use crate::transfer::{
    format_bytes, run_transfer, LineCounts, LineRouter, ProgressLine, StatusDisplay, TransferCommand,
    TransferDisplay, TransferStatus,
};
use crate::utils::Result;
use chrono::{DateTime, Local};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Instant, SystemTime};
use tracing::{error, info, warn};

/// Result of the rsync step
#[derive(Debug, Clone)]
pub struct TransferReport {
    pub command: String,
    pub status: TransferStatus,
    pub counts: LineCounts,
    pub last_progress: Option<ProgressLine>,
    pub last_path: Option<String>,
}

/// Everything one run did
#[derive(Debug, Clone)]
pub struct JobReport {
    pub period: Period,
    pub directory: PathBuf,
    pub seed: SeedOutcome,
    pub transfer: TransferReport,
    pub prune: PruneReport,
    pub duration_secs: u64,
}

/// One backup run for the configured host
pub struct BackupJob {
    config: Config,
}

impl BackupJob {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Execute the job with `now` as the run date
    pub async fn run(&self, now: DateTime<Local>) -> Result<JobReport> {
        let start_time = Instant::now();
        let backup = &self.config.backup;

        info!(
            "========== Backup job started on {} at {} ==========",
            now.format("%b %d %Y"),
            now.format("%H:%M")
        );

        let _lock = if backup.lock {
            Some(RunLock::acquire(&self.config.lock_path())?)
        } else {
            None
        };

        let layout = BackupLayout::new(&backup.base_dir, &backup.host);
        let period = Period::for_date(backup.rotation, now.date_naive());
        let directory = layout.dir_for(&period);

        let seed = {
            let layout = layout.clone();
            let attempts = backup.seed_attempts;
            tokio::task::spawn_blocking(move || seed_current_period(&layout, &period, attempts)).await??
        };

        info!("Starting backup for {} to {}", backup.host, directory.display());
        let transfer = self.transfer(&directory).await;

        // rsync -a copies the source root's mtime onto the destination root
        if let Err(e) = touch(&directory) {
            warn!("Failed to update timestamp of {}: {}", directory.display(), e);
        }

        info!("Purging backups older than {} days...", backup.retention_days);
        let prune = {
            let host_dir = layout.host_dir().to_path_buf();
            let host = backup.host.clone();
            let retention_days = backup.retention_days;
            tokio::task::spawn_blocking(move || {
                prune_old_backups(&host_dir, &host, retention_days, SystemTime::now())
            })
            .await??
        };

        let finished = Local::now();
        info!(
            "========== Backup job finished on {} at {} ==========",
            finished.format("%b %d %Y"),
            finished.format("%H:%M")
        );

        Ok(JobReport {
            period,
            directory,
            seed,
            transfer,
            prune,
            duration_secs: start_time.elapsed().as_secs(),
        })
    }

    async fn transfer(&self, directory: &std::path::Path) -> TransferReport {
        let command = TransferCommand::rsync(
            &self.config.rsync,
            &self.config.exclude_patterns(),
            directory,
        );

        let stdout = std::io::stdout();
        let status_line = stdout.is_terminal().then(|| StatusDisplay::new(stdout));
        let mut display = TransferDisplay::new(LineRouter::new(self.config.log.log_paths), status_line);

        let status = run_transfer(&command, &mut display).await;
        display.finish();

        match &status {
            TransferStatus::Succeeded => info!("Backup completed successfully."),
            TransferStatus::Failed { code: Some(code) } => {
                warn!("Backup finished with errors. Exit code: {}", code)
            }
            TransferStatus::Failed { code: None } => {
                warn!("Backup finished with errors. rsync was terminated by a signal")
            }
            TransferStatus::LaunchFailed(message) => error!("Backup failed: {}", message),
        }

        let router = display.router();
        if let Some(progress) = router.last_progress() {
            info!(
                "Transferred {} ({} files)",
                format_bytes(progress.bytes.unwrap_or(0)),
                progress.transfers.unwrap_or(0)
            );
        }
        let counts = router.counts();
        if counts.errors > 0 || counts.warnings > 0 {
            warn!(
                "rsync reported {} errors and {} warnings",
                counts.errors, counts.warnings
            );
        }

        TransferReport {
            command: command.display(),
            status,
            counts,
            last_progress: router.last_progress().cloned(),
            last_path: router.last_path().map(str::to_string),
        }
    }
}

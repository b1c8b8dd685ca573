//! Backup Host - Main entry point
//!
//! Runs one backup job and exits. Meant to be started by cron or a systemd
//! timer with no arguments.

use anyhow::Result;
use backup_host::{config::Config, utils, BackupJob};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: /etc/backup-host.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Host name used for directory and log names (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Base backup directory (overrides config)
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.backup.host = host;
    }
    if let Some(base_dir) = args.base_dir {
        config.backup.base_dir = base_dir;
    }
    config.validate()?;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level, config.log_file().as_deref())?;

    tracing::debug!(
        "backup-host v{} (host: {}, base: {})",
        env!("CARGO_PKG_VERSION"),
        config.backup.host,
        config.backup.base_dir.display()
    );

    let report = match BackupJob::new(config).run(chrono::Local::now()).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Backup job aborted: {}", e);
            return Err(e.into());
        }
    };

    tracing::debug!(
        "Job took {}s: {} removed, {} kept",
        report.duration_secs,
        report.prune.removed.len(),
        report.prune.kept
    );

    Ok(())
}

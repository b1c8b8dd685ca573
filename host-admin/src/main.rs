//! Host administration helpers run next to the backup job.

mod compose;
mod config;
mod error;
mod wireguard;

use crate::config::AdminConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull updated images for every compose project under the root
    PullImages {
        /// Directory searched for compose files (default: ~/docker)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Recreate containers with `up -d` after pulling
        #[arg(long)]
        up: bool,
    },

    /// Interactive WireGuard server and client setup (run as root)
    WgSetup {
        /// Install wireguard-tools, qrencode and firewalld with dnf first
        #[arg(long)]
        install_packages: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AdminConfig::from_env();

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .init();

    match cli.command {
        Commands::PullImages { root, up } => {
            let root = root.unwrap_or_else(|| config.compose_root.clone());
            let summary = compose::pull_images(&root, &config.compose_command, up).await?;
            if !summary.is_success() {
                anyhow::bail!("{} compose project(s) failed to update", summary.failed.len());
            }
        }
        Commands::WgSetup { install_packages } => {
            let options = wireguard::SetupOptions { install_packages };
            wireguard::run_setup(&config.wg_dir, &options).await?;
        }
    }

    Ok(())
}

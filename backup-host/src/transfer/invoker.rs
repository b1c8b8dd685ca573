//! rsync subprocess: command line construction and streamed execution.

use crate::config::RsyncConfig;
use crate::transfer::classify::classify_line;
use crate::transfer::codec::TransferLineCodec;
use crate::transfer::router::LineSink;
use futures_util::{stream, StreamExt};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TransferCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `rsync -aA[X]v --info=progress2,stats [--no-xattrs] [extra..] <source> <dest> --exclude <p>..`
    pub fn rsync(config: &RsyncConfig, excludes: &[String], dest: &Path) -> Self {
        let mut flags = String::from("-a");
        if config.preserve_acls {
            flags.push('A');
        }
        if config.preserve_xattrs {
            flags.push('X');
        }
        flags.push('v');

        let mut args = vec![flags, "--info=progress2,stats".to_string()];
        if !config.preserve_xattrs {
            args.push("--no-xattrs".to_string());
        }
        args.extend(config.extra_args.iter().cloned());
        args.push(config.source.clone());
        args.push(dest.to_string_lossy().to_string());
        for pattern in excludes {
            args.push("--exclude".to_string());
            args.push(pattern.clone());
        }

        Self::new(config.binary.clone(), args)
    }

    /// Command line for logging
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How the subprocess ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Succeeded,
    /// Nonzero exit; `code` is `None` when killed by a signal
    Failed { code: Option<i32> },
    /// The process never ran
    LaunchFailed(String),
}

impl TransferStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferStatus::Succeeded)
    }
}

/// Run `command`, handing every stdout and stderr line to `sink` as it
/// arrives. Never fails: launch and exit problems are reported in the status.
pub async fn run_transfer<S: LineSink>(command: &TransferCommand, sink: &mut S) -> TransferStatus {
    debug!("Running {}", command.display());

    let mut child = match Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return TransferStatus::LaunchFailed(format!("{}: {}", command.program, e)),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return TransferStatus::LaunchFailed("output pipes unavailable".to_string());
    };

    let mut lines = stream::select(
        FramedRead::new(stdout, TransferLineCodec::new()),
        FramedRead::new(stderr, TransferLineCodec::new()),
    );

    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => sink.on_line(classify_line(&line)),
            Err(e) => {
                warn!("Failed to read transfer output: {}", e);
                break;
            }
        }
    }
    // Close our end of the pipes before waiting
    drop(lines);

    match child.wait().await {
        Ok(status) if status.success() => TransferStatus::Succeeded,
        Ok(status) => TransferStatus::Failed { code: status.code() },
        Err(e) => {
            warn!("Failed to wait for {}: {}", command.program, e);
            TransferStatus::Failed { code: None }
        }
    }
}

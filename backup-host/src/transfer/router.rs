//! Routing of classified rsync lines to the live status line and the log.

use crate::transfer::classify::TransferLine;
use crate::transfer::progress::ProgressLine;
use crate::utils::logger::TRANSFER_TARGET;
use std::io::Write;
use tracing::{error, info, warn};

/// Columns cleared before each status update
pub const STATUS_WIDTH: usize = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
}

impl LogEntry {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Where one line should go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routed {
    /// Replaces the live status line
    pub status: Option<String>,
    pub log: Option<LogEntry>,
}

/// Per-kind line counters for one transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub progress: u64,
    pub paths: u64,
    pub summary: u64,
    pub warnings: u64,
    pub errors: u64,
    pub other: u64,
}

#[derive(Debug, Default)]
pub struct LineRouter {
    log_paths: bool,
    last_logged_dir: Option<String>,
    last_progress: Option<ProgressLine>,
    last_path: Option<String>,
    counts: LineCounts,
}

impl LineRouter {
    pub fn new(log_paths: bool) -> Self {
        Self {
            log_paths,
            ..Self::default()
        }
    }

    pub fn route(&mut self, line: &TransferLine) -> Routed {
        match line {
            TransferLine::Blank => Routed::default(),
            TransferLine::Progress(progress) => {
                self.counts.progress += 1;
                self.last_progress = Some(progress.clone());
                Routed {
                    status: Some(progress.raw.clone()),
                    log: None,
                }
            }
            TransferLine::Path(path) => {
                self.counts.paths += 1;
                self.last_path = Some(path.path.clone());

                // Only checks the previous directory, so an interleaved listing logs repeats
                let dir = path.directory();
                let log = if self.log_paths && self.last_logged_dir.as_deref() != Some(dir) {
                    self.last_logged_dir = Some(dir.to_string());
                    Some(LogEntry::new(Severity::Info, format!("/{dir}")))
                } else {
                    None
                };

                Routed {
                    status: Some(path.path.clone()),
                    log,
                }
            }
            TransferLine::Warning(text) => {
                self.counts.warnings += 1;
                Routed {
                    status: None,
                    log: Some(LogEntry::new(Severity::Warn, text.as_str())),
                }
            }
            TransferLine::Error(text) => {
                self.counts.errors += 1;
                Routed {
                    status: None,
                    log: Some(LogEntry::new(Severity::Error, text.as_str())),
                }
            }
            TransferLine::Summary(text) => {
                self.counts.summary += 1;
                Routed {
                    status: None,
                    log: Some(LogEntry::new(Severity::Info, text.as_str())),
                }
            }
            TransferLine::Other(text) => {
                self.counts.other += 1;
                Routed {
                    status: None,
                    log: Some(LogEntry::new(Severity::Info, text.as_str())),
                }
            }
        }
    }

    pub fn counts(&self) -> LineCounts {
        self.counts
    }

    /// Most recent progress update, which carries the final byte and transfer totals
    pub fn last_progress(&self) -> Option<&ProgressLine> {
        self.last_progress.as_ref()
    }

    pub fn last_path(&self) -> Option<&str> {
        self.last_path.as_deref()
    }
}

/// Single console line rewritten in place with `\r`
pub struct StatusDisplay<W: Write> {
    out: W,
    width: usize,
    dirty: bool,
}

impl<W: Write> StatusDisplay<W> {
    pub fn new(out: W) -> Self {
        Self::with_width(out, STATUS_WIDTH)
    }

    pub fn with_width(out: W, width: usize) -> Self {
        Self {
            out,
            width,
            dirty: false,
        }
    }

    pub fn show(&mut self, text: &str) -> std::io::Result<()> {
        let text: String = text.chars().take(self.width).collect();
        write!(self.out, "\r{:<width$}", text, width = self.width)?;
        self.out.flush()?;
        self.dirty = true;
        Ok(())
    }

    /// Move past the status line so later output starts on a fresh line
    pub fn finish(&mut self) -> std::io::Result<()> {
        if self.dirty {
            writeln!(self.out)?;
            self.out.flush()?;
            self.dirty = false;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Consumer of classified lines as a transfer produces them
pub trait LineSink {
    fn on_line(&mut self, line: TransferLine);
}

/// Routes lines to an optional status display and to tracing under the `rsync` target
pub struct TransferDisplay<W: Write> {
    router: LineRouter,
    status: Option<StatusDisplay<W>>,
}

impl<W: Write> TransferDisplay<W> {
    pub fn new(router: LineRouter, status: Option<StatusDisplay<W>>) -> Self {
        Self { router, status }
    }

    pub fn router(&self) -> &LineRouter {
        &self.router
    }

    pub fn finish(&mut self) {
        if let Some(status) = self.status.as_mut() {
            let _ = status.finish();
        }
    }
}

impl<W: Write> LineSink for TransferDisplay<W> {
    fn on_line(&mut self, line: TransferLine) {
        let routed = self.router.route(&line);

        if let (Some(text), Some(status)) = (routed.status.as_deref(), self.status.as_mut()) {
            // A closed terminal must not stop the backup
            let _ = status.show(text);
        }

        if let Some(entry) = routed.log {
            match entry.severity {
                Severity::Info => info!(target: TRANSFER_TARGET, "{}", entry.message),
                Severity::Warn => warn!(target: TRANSFER_TARGET, "{}", entry.message),
                Severity::Error => error!(target: TRANSFER_TARGET, "{}", entry.message),
            }
        }
    }
}

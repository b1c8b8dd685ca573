//! Classification of rsync output lines.
//!
//! [`classify_line`] applies these rules in order and the first match wins:
//!
//! 1. [`TransferLine::Blank`]: nothing left after trimming.
//! 2. [`TransferLine::Summary`]: starts with one of rsync's `--info=stats`
//!    prefixes. Checked before progress because the closing
//!    `sent ... bytes/sec` line carries a rate.
//! 3. [`TransferLine::Progress`]: has a byte-rate token or a transfer counter
//!    (`xfr#`, `to-chk=`, `ir-chk=`).
//! 4. [`TransferLine::Warning`] / [`TransferLine::Error`]: a report rsync
//!    itself wrote. It starts with `rsync:`, `rsync error` or `rsync warning`,
//!    starts with `file has vanished`, or ends in an errno like `(13)`.
//! 5. [`TransferLine::Path`]: looks like a path rsync is transferring.
//! 6. [`TransferLine::Warning`] / [`TransferLine::Error`]: has a generic
//!    warning or error marker. Applied after the path rule so that files such
//!    as `Error.pm` stay paths.
//! 7. [`TransferLine::Other`]: everything else. No line is dropped.

use crate::transfer::progress::{is_rate_token, ProgressLine};

const SUMMARY_PREFIXES: &[&str] = &[
    "Number of ",
    "Total file size:",
    "Total transferred file size:",
    "Literal data:",
    "Matched data:",
    "File list size:",
    "File list generation time:",
    "File list transfer time:",
    "Total bytes sent:",
    "Total bytes received:",
    "sent ",
    "total size is ",
];

const COUNTER_MARKERS: &[&str] = &["xfr#", "to-chk=", "ir-chk=", "to-check="];

/// Line prefixes of rsync's own reports, matched case-insensitively
const REPORT_WARNING_PREFIXES: &[&str] = &["rsync warning", "file has vanished"];
const REPORT_ERROR_PREFIXES: &[&str] = &["rsync error", "rsync:"];

/// Matched case-insensitively
const WARNING_MARKERS: &[&str] = &["warning:"];

/// Matched case-insensitively
const ERROR_MARKERS: &[&str] = &[
    "bad message",
    "permission denied",
    "no such file or directory",
    "input/output error",
    "operation not permitted",
    "no space left on device",
    "error:",
    "error (",
    "failed:",
    " failed ",
];

/// Matched as written
const CASE_SENSITIVE_ERROR_MARKERS: &[&str] = &["Error", "Bad Message"];

/// A path line from `rsync -v`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLine {
    /// Path relative to the transfer source, as printed
    pub path: String,

    /// rsync prints directories with a trailing `/`
    pub is_dir: bool,

    /// Symlinks are printed as `name -> target`
    pub link_target: Option<String>,
}

impl PathLine {
    /// Directory this entry lives in (the entry itself for directories),
    /// without a trailing slash. Empty for top-level files.
    pub fn directory(&self) -> &str {
        if self.is_dir {
            return self.path.trim_end_matches('/');
        }
        match self.path.rfind('/') {
            Some(index) => &self.path[..index],
            None => "",
        }
    }
}

/// One classified line of transfer output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferLine {
    Blank,
    Summary(String),
    Progress(ProgressLine),
    Warning(String),
    Error(String),
    Path(PathLine),
    Other(String),
}

pub fn classify_line(line: &str) -> TransferLine {
    let text = line.trim();
    if text.is_empty() {
        return TransferLine::Blank;
    }

    if SUMMARY_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
        return TransferLine::Summary(text.to_string());
    }

    if is_progress(text) {
        return TransferLine::Progress(ProgressLine::parse(text));
    }

    let lower = text.to_lowercase();
    if REPORT_WARNING_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return TransferLine::Warning(text.to_string());
    }
    if REPORT_ERROR_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) || ends_with_errno(text) {
        return TransferLine::Error(text.to_string());
    }

    if let Some(path) = parse_path(text) {
        return TransferLine::Path(path);
    }

    if WARNING_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return TransferLine::Warning(text.to_string());
    }
    if ERROR_MARKERS.iter().any(|marker| lower.contains(marker))
        || CASE_SENSITIVE_ERROR_MARKERS.iter().any(|marker| text.contains(marker))
    {
        return TransferLine::Error(text.to_string());
    }

    TransferLine::Other(text.to_string())
}

/// `...: Permission denied (13)`
fn ends_with_errno(text: &str) -> bool {
    let Some(rest) = text.strip_suffix(')') else {
        return false;
    };
    match rest.rsplit_once(" (") {
        Some((message, code)) => {
            message.contains(": ") && !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

fn is_progress(text: &str) -> bool {
    COUNTER_MARKERS.iter().any(|marker| text.contains(marker))
        || text.contains("bytes/sec")
        || text.split_whitespace().any(is_rate_token)
}

fn parse_path(text: &str) -> Option<PathLine> {
    // The transfer root itself
    if text == "./" {
        return None;
    }

    let (path, link_target) = match text.split_once(" -> ") {
        Some((path, target)) => (path, Some(target.to_string())),
        None => (text, None),
    };

    let is_dir = path.len() > 1 && path.ends_with('/');
    let last_segment = path.rsplit('/').next().unwrap_or(path);

    let has_extension = last_segment
        .find('.')
        .map(|index| index + 1 < last_segment.len() && last_segment != "..")
        .unwrap_or(false);
    let is_dunder = last_segment.len() > 4 && last_segment.starts_with("__") && last_segment.ends_with("__");
    let is_nested = path.contains('/') && !path.contains(char::is_whitespace);

    if is_dir || has_extension || is_dunder || is_nested || link_target.is_some() {
        Some(PathLine {
            path: path.to_string(),
            is_dir,
            link_target,
        })
    } else {
        None
    }
}

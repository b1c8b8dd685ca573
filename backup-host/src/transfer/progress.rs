//! Parsing of rsync `--info=progress2` status lines.
//!
//! A progress2 line looks like
//! `  1,238,099,968  45%   35.72MB/s    0:00:33 (xfr#1234, to-chk=567/8901)`.
//! Each field is optional: rsync omits the parenthesised counters until the
//! first file completes.

/// One parsed progress update
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressLine {
    /// Trimmed line as printed
    pub raw: String,

    /// Bytes transferred so far
    pub bytes: Option<u64>,

    /// Overall percent complete (0-100)
    pub percent: Option<u8>,

    /// Rate as printed by rsync, e.g. `35.72MB/s`
    pub rate: Option<String>,

    /// Elapsed or remaining time as printed, e.g. `0:00:33`
    pub elapsed: Option<String>,

    /// Number of files transferred (`xfr#N`)
    pub transfers: Option<u64>,

    /// Files still to check and total files (`to-chk=N/M` or `ir-chk=N/M`)
    pub to_check: Option<(u64, u64)>,
}

impl ProgressLine {
    pub fn parse(line: &str) -> Self {
        let raw = line.trim().to_string();
        let mut progress = ProgressLine::default();

        for token in raw.split_whitespace() {
            let token = token.trim_matches(|c| c == '(' || c == ')' || c == ',');
            if token.is_empty() {
                continue;
            }

            if let Some(count) = token.strip_prefix("xfr#") {
                progress.transfers = count.parse().ok();
            } else if let Some(counts) = token
                .strip_prefix("to-chk=")
                .or_else(|| token.strip_prefix("ir-chk="))
                .or_else(|| token.strip_prefix("to-check="))
            {
                progress.to_check = parse_ratio(counts);
            } else if let Some(percent) = token.strip_suffix('%') {
                progress.percent = percent.parse::<u8>().ok().map(|p| p.min(100));
            } else if is_rate_token(token) {
                progress.rate = Some(token.to_string());
            } else if token.contains(':') && token.chars().all(|c| c.is_ascii_digit() || c == ':') {
                progress.elapsed = Some(token.to_string());
            } else if progress.bytes.is_none() && is_grouped_number(token) {
                progress.bytes = token.replace(',', "").parse().ok();
            }
        }

        progress.raw = raw;
        progress
    }
}

/// `35.72MB/s`, `0.00kB/s`, `912B/s`
pub fn is_rate_token(token: &str) -> bool {
    token.ends_with("B/s")
        && token
            .chars()
            .next()
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
}

fn is_grouped_number(token: &str) -> bool {
    token.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false)
        && token.chars().all(|c| c.is_ascii_digit() || c == ',')
}

fn parse_ratio(counts: &str) -> Option<(u64, u64)> {
    let (left, right) = counts.split_once('/')?;
    Some((left.parse().ok()?, right.parse().ok()?))
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

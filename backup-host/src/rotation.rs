//! Backup period naming and seed lookup.
//!
//! A period is the time bucket that maps to exactly one backup directory
//! under `<base_dir>/<host>/`. Weekly periods use the ISO week of the run
//! date; daily periods use the calendar date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Week number used when stepping back from week 1. ISO years with a week
/// 53 are treated as if it did not exist.
const LAST_WEEK_OF_YEAR: u32 = 52;

/// Length of one backup period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Weekly,
    Daily,
}

/// One backup period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Period {
    Week { year: i32, week: u32 },
    Day(NaiveDate),
}

impl Period {
    /// Period containing `date`
    pub fn for_date(rotation: Rotation, date: NaiveDate) -> Self {
        match rotation {
            Rotation::Weekly => {
                let iso = date.iso_week();
                Period::Week {
                    year: iso.year(),
                    week: iso.week(),
                }
            }
            Rotation::Daily => Period::Day(date),
        }
    }

    /// The period immediately before this one
    pub fn previous(&self) -> Option<Self> {
        match *self {
            Period::Week { year, week } if week <= 1 => Some(Period::Week {
                year: year.checked_sub(1)?,
                week: LAST_WEEK_OF_YEAR,
            }),
            Period::Week { year, week } => Some(Period::Week {
                year,
                week: week - 1,
            }),
            Period::Day(date) => date.pred_opt().map(Period::Day),
        }
    }

    /// Directory name for this period, e.g. `web01-W05-2025`
    pub fn dir_name(&self, host: &str) -> String {
        format!("{host}-{self}")
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Week { year, week } => write!(f, "W{week:02}-{year:04}"),
            Period::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Seed directory found by [`BackupLayout::find_seed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSource {
    pub period: Period,
    pub path: PathBuf,
}

/// Resolves backup directories for one host
#[derive(Debug, Clone)]
pub struct BackupLayout {
    host: String,
    host_dir: PathBuf,
}

impl BackupLayout {
    pub fn new(base_dir: &Path, host: &str) -> Self {
        Self {
            host: host.to_string(),
            host_dir: base_dir.join(host),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `<base_dir>/<host>`
    pub fn host_dir(&self) -> &Path {
        &self.host_dir
    }

    /// `<base_dir>/<host>/<host>-<period>`
    pub fn dir_for(&self, period: &Period) -> PathBuf {
        self.host_dir.join(period.dir_name(&self.host))
    }

    /// Walk back from `current` for up to `attempts` earlier periods and
    /// return the first one whose directory exists.
    pub fn find_seed(&self, current: &Period, attempts: u32) -> Option<SeedSource> {
        let mut period = *current;
        for _ in 0..attempts {
            period = period.previous()?;
            let path = self.dir_for(&period);
            if path.is_dir() {
                return Some(SeedSource { period, path });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekly_dir_name() {
        let period = Period::for_date(Rotation::Weekly, date(2025, 1, 29));
        assert_eq!(period, Period::Week { year: 2025, week: 5 });
        assert_eq!(period.dir_name("web01"), "web01-W05-2025");
    }

    #[test]
    fn test_daily_dir_name() {
        let period = Period::for_date(Rotation::Daily, date(2024, 1, 1));
        assert_eq!(period.dir_name("web01"), "web01-2024-01-01");
    }

    #[test]
    fn test_iso_year_differs_from_calendar_year() {
        // 2024-12-30 falls in ISO week 1 of 2025
        let period = Period::for_date(Rotation::Weekly, date(2024, 12, 30));
        assert_eq!(period.dir_name("h"), "h-W01-2025");
    }

    #[test]
    fn test_name_shape_for_every_day_of_two_years() {
        let mut day = date(2024, 1, 1);
        while day < date(2026, 1, 1) {
            let name = Period::for_date(Rotation::Weekly, day).dir_name("web01");
            let rest = name.strip_prefix("web01-W").unwrap();
            let (week, year) = rest.split_once('-').unwrap();
            assert_eq!(week.len(), 2, "{name}");
            assert!(week.chars().all(|c| c.is_ascii_digit()), "{name}");
            assert_eq!(year.len(), 4, "{name}");
            assert!(year.chars().all(|c| c.is_ascii_digit()), "{name}");
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_previous_wraps_week_one_to_week_52() {
        let period = Period::Week { year: 2025, week: 1 };
        assert_eq!(
            period.previous(),
            Some(Period::Week { year: 2024, week: 52 })
        );

        let period = Period::Week { year: 2025, week: 5 };
        assert_eq!(period.previous(), Some(Period::Week { year: 2025, week: 4 }));
    }

    #[test]
    fn test_previous_treats_week_53_as_its_own_start() {
        // 2020 had an ISO week 53; stepping back from it stays in 2020
        let period = Period::for_date(Rotation::Weekly, date(2020, 12, 31));
        assert_eq!(period, Period::Week { year: 2020, week: 53 });
        assert_eq!(period.previous(), Some(Period::Week { year: 2020, week: 52 }));
    }

    #[test]
    fn test_previous_day() {
        let period = Period::Day(date(2025, 3, 1));
        assert_eq!(period.previous(), Some(Period::Day(date(2025, 2, 28))));
    }

    #[test]
    fn test_find_seed_prefers_nearest() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = BackupLayout::new(temp_dir.path(), "web01");
        fs::create_dir_all(layout.host_dir().join("web01-W04-2025"))?;
        fs::create_dir_all(layout.host_dir().join("web01-W03-2025"))?;

        let current = Period::Week { year: 2025, week: 5 };
        let seed = layout.find_seed(&current, 10).unwrap();
        assert_eq!(seed.period, Period::Week { year: 2025, week: 4 });
        assert_eq!(seed.path, layout.host_dir().join("web01-W04-2025"));
        Ok(())
    }

    #[test]
    fn test_find_seed_never_picks_current_or_later() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = BackupLayout::new(temp_dir.path(), "web01");
        fs::create_dir_all(layout.host_dir().join("web01-W05-2025"))?;
        fs::create_dir_all(layout.host_dir().join("web01-W06-2025"))?;
        fs::create_dir_all(layout.host_dir().join("web01-W02-2025"))?;

        let current = Period::Week { year: 2025, week: 5 };
        let seed = layout.find_seed(&current, 10).unwrap();
        assert!(seed.period < current);
        assert_eq!(seed.period, Period::Week { year: 2025, week: 2 });
        Ok(())
    }

    #[test]
    fn test_find_seed_crosses_year_boundary() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = BackupLayout::new(temp_dir.path(), "web01");
        fs::create_dir_all(layout.host_dir().join("web01-W51-2024"))?;

        let current = Period::Week { year: 2025, week: 2 };
        let seed = layout.find_seed(&current, 10).unwrap();
        assert_eq!(seed.period, Period::Week { year: 2024, week: 51 });
        Ok(())
    }

    #[test]
    fn test_find_seed_respects_attempt_bound() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = BackupLayout::new(temp_dir.path(), "web01");
        fs::create_dir_all(layout.host_dir().join("web01-W01-2025"))?;

        let current = Period::Week { year: 2025, week: 12 };
        assert!(layout.find_seed(&current, 10).is_none());
        assert!(layout.find_seed(&current, 11).is_some());
        assert!(layout.find_seed(&current, 0).is_none());
        Ok(())
    }

    #[test]
    fn test_find_seed_ignores_other_hosts_and_files() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = BackupLayout::new(temp_dir.path(), "web01");
        fs::create_dir_all(layout.host_dir())?;
        fs::write(layout.host_dir().join("web01-W04-2025"), b"not a dir")?;
        fs::create_dir_all(temp_dir.path().join("web02/web02-W04-2025"))?;

        let current = Period::Week { year: 2025, week: 5 };
        assert!(layout.find_seed(&current, 3).is_none());
        Ok(())
    }
}

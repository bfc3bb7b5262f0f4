use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// ISO-8601 calendar week, rendered as `YYYY-Www` (e.g. `2025-W01`).
///
/// Ordering is by (iso_year, week) as integers. The string form happens to
/// sort the same way for same-length years, but week ids must never be
/// compared lexicographically, so ordering lives on the parsed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekId {
    pub iso_year: i32,
    pub week: u32,
}

impl WeekId {
    /// Week containing the given local calendar date.
    ///
    /// ISO week numbering: week 1 is the week containing the year's first
    /// Thursday, so a late-December date can land in week 1 of the next
    /// year and an early-January date in the last week of the previous one.
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            iso_year: iso.year(),
            week: iso.week(),
        }
    }

    /// Week containing a UTC instant, resolved in local time.
    pub fn of_instant(instant: DateTime<Utc>) -> Self {
        let local: DateTime<Local> = DateTime::from(instant);
        Self::of(local.date_naive())
    }

    pub fn current() -> Self {
        Self::of(Local::now().date_naive())
    }

    /// The week immediately before this one.
    ///
    /// Reconstructs a date inside the week and steps back seven days rather
    /// than decrementing the week number, so 52- vs 53-week years come out
    /// right at year boundaries.
    pub fn previous(self) -> Self {
        let monday = NaiveDate::from_isoywd_opt(self.iso_year, self.week, Weekday::Mon)
            // A week number past the end of a 52-week year has no date;
            // fall back to that year's last valid week.
            .or_else(|| NaiveDate::from_isoywd_opt(self.iso_year, 52, Weekday::Mon))
            .unwrap_or_default();
        Self::of(monday - Duration::days(7))
    }

    /// Monday of this week.
    pub fn start_date(self) -> NaiveDate {
        NaiveDate::from_isoywd_opt(self.iso_year, self.week, Weekday::Mon)
            .or_else(|| NaiveDate::from_isoywd_opt(self.iso_year, 52, Weekday::Mon))
            .unwrap_or_default()
    }

    /// Sunday of this week (display end; the working window is half-open).
    pub fn end_date(self) -> NaiveDate {
        self.start_date() + Duration::days(6)
    }
}

/// Half-open `[Monday, next Monday)` window containing `today`.
/// Monday is the canonical week start regardless of locale.
pub fn week_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(7))
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.iso_year, self.week)
    }
}

impl FromStr for WeekId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (year_str, week_str) = s
            .split_once("-W")
            .ok_or_else(|| anyhow!("Invalid week id: {}", s))?;
        let iso_year: i32 = year_str
            .parse()
            .map_err(|_| anyhow!("Invalid year in week id: {}", s))?;
        let week: u32 = week_str
            .parse()
            .map_err(|_| anyhow!("Invalid week number in week id: {}", s))?;
        if !(1..=53).contains(&week) {
            return Err(anyhow!("Week number out of range: {}", s));
        }
        Ok(Self { iso_year, week })
    }
}

// Stored and transported as the `YYYY-Www` string (matches the weekly_stats
// table column).
impl Serialize for WeekId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//! Date window and timestamp helpers.
//!
//! Windows are half-open: `[start, end)` on UTC instants. Days are "YYYY-MM-DD".

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Half-open window `[start, end)` with both bounds at UTC midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self> {
        if start > end {
            return Err(anyhow!("date range start {start} is after end {end}"));
        }
        Ok(Self { start, end })
    }

    /// Parse two "YYYY-MM-DD" days.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_day(start)?, parse_day(end)?)
    }

    pub fn start_instant(&self) -> OffsetDateTime {
        PrimitiveDateTime::new(self.start, Time::MIDNIGHT).assume_utc()
    }

    pub fn end_instant(&self) -> OffsetDateTime {
        PrimitiveDateTime::new(self.end, Time::MIDNIGHT).assume_utc()
    }

    #[inline]
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        ts >= self.start_instant() && ts < self.end_instant()
    }

    /// Every calendar day from `start` through `end`, both included.
    /// Archive folders for the end day may still hold records created before it.
    pub fn days(&self) -> impl Iterator<Item = Date> {
        iter_days(self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl FromStr for DateRange {
    type Err = anyhow::Error;
    /// "YYYY-MM-DD..YYYY-MM-DD"
    fn from_str(s: &str) -> Result<Self> {
        let (a, b) = s
            .split_once("..")
            .ok_or_else(|| anyhow!("expected YYYY-MM-DD..YYYY-MM-DD"))?;
        Self::parse(a.trim(), b.trim())
    }
}

pub fn parse_day(s: &str) -> Result<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| anyhow!("invalid day {s:?}: {e}"))
}

/// Inclusive iteration from `start` to `end` (if `start` <= `end`), else empty.
pub fn iter_days(start: Date, end: Date) -> impl Iterator<Item = Date> {
    let mut curr = if start <= end { Some(start) } else { None };
    std::iter::from_fn(move || {
        let ret = curr?;
        curr = ret.next_day().filter(|n| *n <= end);
        Some(ret)
    })
}

/// Parse the timestamp shapes both platforms emit and normalize to UTC.
///
/// Accepts RFC 3339 (`Z` or numeric offset, any fractional precision),
/// `+HHMM` offsets without a colon, offset-less `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (read as UTC) and a bare `YYYY-MM-DD` (UTC midnight).
pub fn parse_timestamp(s: &str) -> Result<OffsetDateTime> {
    let s = s.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(dt.to_offset(UtcOffset::UTC));
    }
    let compact_offset = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory][offset_minute]"
    );
    if let Ok(dt) = OffsetDateTime::parse(s, compact_offset) {
        return Ok(dt.to_offset(UtcOffset::UTC));
    }
    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    if let Ok(dt) = PrimitiveDateTime::parse(s, naive) {
        return Ok(dt.assume_utc());
    }
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT).assume_utc())
        .map_err(|e| anyhow!("unrecognized timestamp {s:?}: {e}"))
}

/// Wall time until `reset`; zero when it already passed.
pub fn time_until(reset: OffsetDateTime, now: OffsetDateTime) -> std::time::Duration {
    std::time::Duration::try_from(reset - now).unwrap_or(std::time::Duration::ZERO)
}

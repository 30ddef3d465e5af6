// src/window.rs
//! Sync windows: resolving a duration token against "now" and walking the
//! calendar days it covers in local time.

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("unknown sync duration '{0}' (expected today, 24h, 3d, 7d, 30d or 90d)")]
    UnknownDuration(String),
    #[error("window start {start} is after end {end}")]
    Inverted { start: String, end: String },
    #[error("window end {end} is in the future (now is {now})")]
    InFuture { end: String, now: String },
    #[error("local midnight for {0} is not representable")]
    Midnight(NaiveDate),
}

/// Requested sync duration token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncDuration {
    Today,
    Last24Hours,
    Days3,
    Days7,
    Days30,
    Days90,
}

impl SyncDuration {
    pub fn token(&self) -> &'static str {
        match self {
            SyncDuration::Today => "today",
            SyncDuration::Last24Hours => "24h",
            SyncDuration::Days3 => "3d",
            SyncDuration::Days7 => "7d",
            SyncDuration::Days30 => "30d",
            SyncDuration::Days90 => "90d",
        }
    }

    pub fn all() -> &'static [SyncDuration] {
        &[
            SyncDuration::Today,
            SyncDuration::Last24Hours,
            SyncDuration::Days3,
            SyncDuration::Days7,
            SyncDuration::Days30,
            SyncDuration::Days90,
        ]
    }

    /// Number of calendar days for the day-based tokens
    fn calendar_days(&self) -> Option<u64> {
        match self {
            SyncDuration::Today => Some(1),
            SyncDuration::Last24Hours => None,
            SyncDuration::Days3 => Some(3),
            SyncDuration::Days7 => Some(7),
            SyncDuration::Days30 => Some(30),
            SyncDuration::Days90 => Some(90),
        }
    }
}

impl FromStr for SyncDuration {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncDuration::all()
            .iter()
            .copied()
            .find(|d| d.token().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WindowError::UnknownDuration(s.to_string()))
    }
}

impl std::fmt::Display for SyncDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Concrete `{start, end}` of one sync pass. Invariant: `start <= end <= now`
/// at construction time. Calendar days are evaluated in `start`'s offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl SyncWindow {
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    ) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        if end > now {
            return Err(WindowError::InFuture {
                end: end.to_rfc3339(),
                now: now.to_rfc3339(),
            });
        }
        // Keep both ends in the local offset so day arithmetic is consistent.
        let offset = *now.offset();
        Ok(Self {
            start: start.with_timezone(&offset),
            end: end.with_timezone(&offset),
        })
    }

    /// Resolve a duration token. Day-based tokens start at local midnight of
    /// the first covered day (`today` = since midnight, `7d` = today plus the
    /// six days before it); `24h` is a rolling span.
    pub fn resolve(duration: SyncDuration, now: DateTime<FixedOffset>) -> Result<Self, WindowError> {
        let start = match duration.calendar_days() {
            None => now - Duration::hours(24),
            Some(days) => {
                let first_day = now
                    .date_naive()
                    .checked_sub_days(Days::new(days - 1))
                    .ok_or(WindowError::Midnight(now.date_naive()))?;
                local_midnight(first_day, now.offset())?
            }
        };
        Self::new(start, now, now)
    }

    /// Window covering exactly `span` ending at `now`.
    pub fn span_ending(now: DateTime<FixedOffset>, span: Duration) -> Result<Self, WindowError> {
        Self::new(now - span, now, now)
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn offset(&self) -> FixedOffset {
        *self.start.offset()
    }

    pub fn contains(&self, ts: &DateTime<FixedOffset>) -> bool {
        *ts >= self.start && *ts <= self.end
    }

    /// Every local calendar date the window touches, inclusive.
    pub fn days(&self) -> Vec<NaiveDate> {
        let last = self.end.date_naive();
        self.start
            .date_naive()
            .iter_days()
            .take_while(|d| *d <= last)
            .collect()
    }

    /// Per-day sub-ranges clipped to the window, for queries that must run one
    /// calendar day at a time.
    pub fn day_ranges(&self) -> Result<Vec<DayRange>, WindowError> {
        let offset = self.offset();
        let mut ranges = Vec::new();
        for date in self.days() {
            let midnight = local_midnight(date, &offset)?;
            let next = date
                .checked_add_days(Days::new(1))
                .ok_or(WindowError::Midnight(date))?;
            let next_midnight = local_midnight(next, &offset)?;
            ranges.push(DayRange {
                date,
                start: midnight.max(self.start),
                end: next_midnight.min(self.end),
            });
        }
        Ok(ranges)
    }
}

/// One local calendar day of a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayRange {
    pub date: NaiveDate,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Local calendar date of a timestamp in the given offset.
pub fn local_day(ts: &DateTime<FixedOffset>, offset: &FixedOffset) -> NaiveDate {
    ts.with_timezone(offset).date_naive()
}

pub fn local_midnight(
    date: NaiveDate,
    offset: &FixedOffset,
) -> Result<DateTime<FixedOffset>, WindowError> {
    offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .ok_or(WindowError::Midnight(date))
}

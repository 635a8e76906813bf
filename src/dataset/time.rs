//! Flexible ISO-8601 parsing, normalized to UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

/// Date-time layouts accepted when the input carries no UTC offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Date-time layouts with an explicit offset (`+01`, `+0100`, `+01:00`).
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
];

/// A parsed query time, remembering whether the caller gave only a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBound {
    pub instant: DateTime<Utc>,
    pub date_only: bool,
}

impl TimeBound {
    /// Lower bound: the instant as given (midnight for a bare date).
    pub fn start(self) -> DateTime<Utc> {
        self.instant
    }

    /// Upper bound: a bare date covers the whole day up to 23:59:59.
    pub fn end(self) -> DateTime<Utc> {
        if self.date_only {
            self.instant + TimeDelta::days(1) - TimeDelta::seconds(1)
        } else {
            self.instant
        }
    }
}

/// Parses an ISO-8601 instant. Inputs without an offset are taken as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    parse_bound(raw).map(|b| b.instant)
}

/// Parses an ISO-8601 date or date-time into a [`TimeBound`].
pub fn parse_bound(raw: &str) -> Option<TimeBound> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(timed(dt.with_timezone(&Utc)));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(timed(dt.with_timezone(&Utc)));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(timed(naive.and_utc()));
        }
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(TimeBound {
        instant: date.and_hms_opt(0, 0, 0)?.and_utc(),
        date_only: true,
    })
}

fn timed(instant: DateTime<Utc>) -> TimeBound {
    TimeBound {
        instant,
        date_only: false,
    }
}

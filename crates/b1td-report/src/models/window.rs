//! Trailing time windows
//!
//! A report always covers the period ending "now". The period is written as a
//! count and a unit letter (`3d`, `2w`, `1m`) and resolved against a reference
//! instant into an absolute `[t0, t1]` range of Unix seconds.
//!
//! `m` is four weeks, not a calendar month. Report templates and customers
//! have always seen "1m" mean 28 days, so the approximation is kept.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Unit of a [`TimePeriod`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    /// Days
    Day,
    /// Weeks
    Week,
    /// Four-week "months"
    Month,
}

impl PeriodUnit {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'd' => Some(Self::Day),
            'w' => Some(Self::Week),
            'm' => Some(Self::Month),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Day => 'd',
            Self::Week => 'w',
            Self::Month => 'm',
        }
    }

    fn seconds(self) -> i64 {
        match self {
            Self::Day => SECONDS_PER_DAY,
            Self::Week => SECONDS_PER_WEEK,
            Self::Month => 4 * SECONDS_PER_WEEK,
        }
    }
}

/// A report period such as `3d`, `2w` or `1m`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimePeriod {
    /// Number of units
    pub count: u32,
    /// Unit of the period
    pub unit: PeriodUnit,
}

impl TimePeriod {
    /// Create a period from its parts
    pub fn new(count: u32, unit: PeriodUnit) -> Self {
        Self { count, unit }
    }

    /// Length of the period in seconds
    pub fn as_seconds(&self) -> i64 {
        i64::from(self.count) * self.unit.seconds()
    }

    /// Resolve against `now` into an absolute window
    pub fn window_ending(&self, now: DateTime<Utc>) -> TimeWindow {
        let t1 = now.timestamp();
        TimeWindow {
            t0: t1 - self.as_seconds(),
            t1,
        }
    }
}

impl Default for TimePeriod {
    fn default() -> Self {
        Self::new(1, PeriodUnit::Week)
    }
}

impl FromStr for TimePeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        let Some(last) = token.chars().last() else {
            return Err(Error::invalid_period(s, "period is empty"));
        };

        let unit = PeriodUnit::from_char(last).ok_or_else(|| {
            Error::invalid_period(
                s,
                format!("unit must be one of d:days, w:weeks, m:months not {last}"),
            )
        })?;

        let digits = &token[..token.len() - last.len_utf8()];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_period(
                s,
                "count must be a non-negative integer",
            ));
        }

        let count = digits
            .parse::<u32>()
            .map_err(|e| Error::invalid_period(s, e.to_string()))?;

        Ok(Self { count, unit })
    }
}

impl TryFrom<String> for TimePeriod {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimePeriod> for String {
    fn from(period: TimePeriod) -> Self {
        period.to_string()
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.as_char())
    }
}

/// Absolute query window in Unix seconds, `t0 <= t1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window
    pub t0: i64,
    /// End of the window
    pub t1: i64,
}

impl TimeWindow {
    /// Length of the window in seconds
    pub fn duration_secs(&self) -> i64 {
        self.t1 - self.t0
    }
}

/// Resolve a period token against a reference instant.
///
/// `t1` is `now` truncated to whole seconds and `t0` is `t1` minus the period.
/// Fails with [`Error::InvalidPeriod`] for anything but `<digits><d|w|m>`.
pub fn resolve(period: &str, now: DateTime<Utc>) -> Result<TimeWindow> {
    let period: TimePeriod = period.parse()?;
    Ok(period.window_ending(now))
}

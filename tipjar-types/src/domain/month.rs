//! Calendar-month settlement window.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// A calendar month in UTC, used as the aggregation window for exchanges.
///
/// Serializes as `"YYYY-MM"`. All cutoff instants derived from it are the
/// first instant of a month, so boundary comparisons are always exclusive
/// (`created_at < cutoff`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

/// Accepted year range. Keeps every derived cutoff instant well inside
/// chrono's representable range, so `start()` can never fail.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1970..=9999;

impl YearMonth {
    /// Creates a new YearMonth. The month must be in `1..=12` and the year
    /// in `1970..=9999`.
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::Validation(format!(
                "month out of range: {}",
                month
            )));
        }
        if !YEAR_RANGE.contains(&year) {
            return Err(DomainError::Validation(format!(
                "year out of range: {}",
                year
            )));
        }
        Ok(Self { year, month })
    }

    /// The month containing the given instant.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        use chrono::Datelike;
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First instant of this month (midnight on the 1st, UTC).
    pub fn start(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
            .expect("first of month is always a valid UTC instant")
    }

    /// First instant of the following month. This is the request-time
    /// aggregation cutoff: "end of the requested month", exclusive.
    pub fn start_of_next(&self) -> DateTime<Utc> {
        self.next().start()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| DomainError::Validation(format!("invalid month: {}", s)))?;
        let year: i32 = year
            .parse()
            .map_err(|_| DomainError::Validation(format!("invalid month: {}", s)))?;
        let month: u32 = month
            .parse()
            .map_err(|_| DomainError::Validation(format!("invalid month: {}", s)))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<YearMonth> for String {
    fn from(ym: YearMonth) -> Self {
        ym.to_string()
    }
}

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage and display format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date. Non-existent days (e.g. `2025-02-30`) are rejected.
pub fn parse_date(input: &str) -> Result<NaiveDate, ParseDateError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| ParseDateError(input.trim().to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date '{0}', expected YYYY-MM-DD")]
pub struct ParseDateError(pub String);

/// A calendar month key, rendered as `YYYY-MM`.
///
/// Ordering is chronological, which matches the lexicographic order of the
/// rendered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=9999).contains(&year) {
            return Err(PeriodError::InvalidYear(year));
        }
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated year and month")
    }

    /// Last calendar day of the month (28, 29, 30 or 31).
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().expect("month after year 1")
    }

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

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for YearMonth {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for YearMonth {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| PeriodError::InvalidKey(s.to_string()))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(PeriodError::InvalidKey(s.to_string()));
        }
        let year = year
            .parse()
            .map_err(|_| PeriodError::InvalidKey(s.to_string()))?;
        let month = month
            .parse()
            .map_err(|_| PeriodError::InvalidKey(s.to_string()))?;
        Self::new(year, month)
    }
}

/// The period a report covers: a whole year, or one month of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReportPeriodParts")]
pub struct ReportPeriod {
    year: i32,
    month: Option<u32>,
}

/// Unvalidated wire form of [`ReportPeriod`].
#[derive(Deserialize)]
struct ReportPeriodParts {
    year: i32,
    month: Option<u32>,
}

impl TryFrom<ReportPeriodParts> for ReportPeriod {
    type Error = PeriodError;

    fn try_from(parts: ReportPeriodParts) -> Result<Self, Self::Error> {
        Self::new(parts.year, parts.month)
    }
}

impl ReportPeriod {
    pub fn new(year: i32, month: Option<u32>) -> Result<Self, PeriodError> {
        // Validates both parts through the month key
        YearMonth::new(year, month.unwrap_or(1))?;
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    /// Inclusive date bounds of the period, using real month ends.
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        match self.month {
            Some(month) => {
                let ym = YearMonth {
                    year: self.year,
                    month,
                };
                (ym.first_day(), ym.last_day())
            }
            None => (
                YearMonth {
                    year: self.year,
                    month: 1,
                }
                .first_day(),
                YearMonth {
                    year: self.year,
                    month: 12,
                }
                .last_day(),
            ),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let (from, to) = self.bounds();
        from <= date && date <= to
    }

    /// The 12 month keys of the period's year, January first.
    pub fn months(&self) -> [YearMonth; 12] {
        std::array::from_fn(|i| YearMonth {
            year: self.year,
            month: i as u32 + 1,
        })
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(month) => write!(f, "{:04}-{:02}", self.year, month),
            None => write!(f, "{:04}", self.year),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("year must be between 1 and 9999, got {0}")]
    InvalidYear(i32),
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("invalid month key '{0}', expected YYYY-MM")]
    InvalidKey(String),
}

//! # Local Time and Billing Periods
//!
//! The condominium books everything in local wall-clock time at a fixed UTC
//! offset (the default, `-05:00`, has no daylight saving). [`LocalClock`]
//! produces that time and can be frozen for tests. [`BillingPeriod`] is the
//! `YYYY-MM` month a fee applies to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Format used for registration stamps (`FECHA_REGISTRO`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Format used for due dates (`FECHA_VENCIMIENTO`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default condominium offset, UTC-5.
pub const DEFAULT_UTC_OFFSET: &str = "-05:00";

/// Source of local time.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    offset: FixedOffset,
    frozen: Option<DateTime<Utc>>,
}

impl LocalClock {
    /// A live clock at the given offset.
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            frozen: None,
        }
    }

    /// A clock that always reports `instant`.
    pub fn frozen(offset: FixedOffset, instant: DateTime<Utc>) -> Self {
        Self {
            offset,
            frozen: Some(instant),
        }
    }

    /// The configured offset.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current local date-time.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.frozen
            .unwrap_or_else(Utc::now)
            .with_timezone(&self.offset)
    }

    /// Current local date.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Current local stamp in [`TIMESTAMP_FORMAT`].
    pub fn stamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }

    /// The billing period containing today.
    pub fn current_period(&self) -> BillingPeriod {
        BillingPeriod::containing(self.today())
    }
}

impl Default for LocalClock {
    fn default() -> Self {
        Self::new(FixedOffset::west_opt(5 * 3600).unwrap_or_else(|| Utc.fix()))
    }
}

/// Parse a `±HH:MM` offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ValidationError> {
    let err = || ValidationError::InvalidUtcOffset(raw.to_string());
    let trimmed = raw.trim();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        _ => return Err(err()),
    };
    let (h, m) = rest.split_once(':').ok_or_else(err)?;
    let hours: i32 = h.parse().map_err(|_| err())?;
    let minutes: i32 = m.parse().map_err(|_| err())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(err());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(err)
}

/// Parse a registration stamp. Accepts `YYYY-MM-DD HH:MM` or anything whose
/// first whitespace-separated token is `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            let first = raw.split_whitespace().next()?;
            parse_date(first).and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// A `YYYY-MM` billing month (`MES_PERIODO`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// Build a period, validating the month.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(ValidationError::InvalidPeriod(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// The period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Year component.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month component (1-12).
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The date in this period on which fees fall due.
    pub fn due_date(&self, day: u32) -> Result<NaiveDate, ValidationError> {
        NaiveDate::from_ymd_opt(self.year, self.month, day).ok_or_else(|| {
            ValidationError::InvalidDueDay {
                period: self.to_string(),
                day,
            }
        })
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ValidationError::InvalidPeriod(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(err)?;
        if y.len() != 4 || m.is_empty() || m.len() > 2 {
            return Err(err());
        }
        if !y.bytes().all(|b| b.is_ascii_digit()) || !m.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let year = y.parse().map_err(|_| err())?;
        let month = m.parse().map_err(|_| err())?;
        Self::new(year, month).map_err(|_| err())
    }
}

impl Serialize for BillingPeriod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BillingPeriod {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

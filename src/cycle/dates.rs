//! Calendar arithmetic for cycle boundaries.
//!
//! All boundaries are UTC instants. Conversion to a local zone belongs to
//! whatever renders them.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{BillingError, Result};

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

/// 23:59:59 UTC on `date`.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::seconds(1)
}

/// `date` moved by `days`, or an error where the calendar would overflow.
///
/// The result always leaves room for its own `end_of_day`.
pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .filter(|shifted| *shifted < NaiveDate::MAX)
        .ok_or_else(|| BillingError::InvalidDate(format!("{date} + {days} days")))
}

/// Last calendar day of the month containing `date`.
pub fn end_of_month(date: NaiveDate) -> Result<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .ok_or_else(|| BillingError::InvalidDate(date.to_string()))?;
    let next_first = first
        .checked_add_months(Months::new(1))
        .ok_or_else(|| BillingError::InvalidDate(date.to_string()))?;
    next_first
        .pred_opt()
        .ok_or_else(|| BillingError::InvalidDate(date.to_string()))
}

pub fn is_end_of_month(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

/// Which day of the month a utility bill is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingDay {
    EndOfMonth,
    Day(u32),
}

impl BillingDay {
    pub fn of(date: NaiveDate) -> Self {
        if is_end_of_month(date) {
            Self::EndOfMonth
        } else {
            Self::Day(date.day())
        }
    }
}

/// Advance `date` by one calendar month, keeping its billing day.
///
/// A date on the last day of its month stays on the last day (Feb 29 ->
/// Mar 31), any other day keeps its day number, clamped to the target
/// month's length.
pub fn next_billing_date(date: NaiveDate) -> Result<NaiveDate> {
    let shifted = date
        .checked_add_months(Months::new(1))
        .ok_or_else(|| BillingError::InvalidDate(date.to_string()))?;
    match BillingDay::of(date) {
        BillingDay::EndOfMonth => end_of_month(shifted),
        BillingDay::Day(_) => Ok(shifted),
    }
}

/// Whole calendar days from `due` to `today`, never negative.
pub fn calendar_days_overdue(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now.date_naive() - due.date_naive()).num_days().max(0)
}

/// Parse a CLI or config timestamp: either `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| BillingError::InvalidDate(raw.to_string()))
}

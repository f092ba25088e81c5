//! 14-digit capture timestamps and date-filter expansion.
//!
//! The index stores capture times as `yyyyMMddhhmmss`. Date filters may be
//! given as a prefix of that form; `from` bounds expand to the start of the
//! period and `to` bounds to its end.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::error_handling::{Error, Result};

/// Length of a full capture timestamp.
pub const TIMESTAMP_LEN: usize = 14;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const START_OF_PERIOD: &str = "00000101000000";

/// Prefix lengths accepted for date filters: yyyy, MM, dd, hh, mm, ss.
const ACCEPTED_PREFIX_LENGTHS: [usize; 6] = [4, 6, 8, 10, 12, 14];

/// Returns true for a 14-character all-digit string.
pub fn is_full_timestamp(value: &str) -> bool {
    value.len() == TIMESTAMP_LEN && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a full 14-digit timestamp.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if !is_full_timestamp(value) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn human_readable(value: &str) -> Option<String> {
    parse_timestamp(value).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Absolute distance between two timestamps in seconds.
pub fn distance_seconds(a: &str, b: &str) -> Option<i64> {
    let a = parse_timestamp(a)?;
    let b = parse_timestamp(b)?;
    Some((a - b).num_seconds().abs())
}

/// Expands a date prefix to the first second of the period it names.
///
/// `"2020"` becomes `"20200101000000"`, `"202003"` becomes `"20200301000000"`.
///
/// # Errors
///
/// Returns `Error::Configuration` if the value is not a digit-only prefix of
/// 4, 6, 8, 10, 12 or 14 characters naming a real date.
pub fn expand_from(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;
    let expanded = format!("{}{}", prefix, &START_OF_PERIOD[prefix.len()..]);
    ensure_valid(prefix, expanded)
}

/// Expands a date prefix to the last second of the period it names.
///
/// `"2020"` becomes `"20201231235959"`, `"202002"` becomes `"20200229235959"`.
///
/// # Errors
///
/// Same conditions as [`expand_from`].
pub fn expand_to(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;
    let expanded = match prefix.len() {
        4 => format!("{prefix}1231235959"),
        6 => {
            let year: i32 = parse_digits(&prefix[..4], prefix)?;
            let month: u32 = parse_digits(&prefix[4..6], prefix)?;
            let last_day = last_day_of_month(year, month).ok_or_else(|| invalid_date(prefix))?;
            format!("{prefix}{last_day:02}235959")
        }
        8 => format!("{prefix}235959"),
        10 => format!("{prefix}5959"),
        12 => format!("{prefix}59"),
        _ => prefix.to_string(),
    };
    ensure_valid(prefix, expanded)
}

/// Last day of a month, `None` for an invalid month.
fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    // Rejects month 0, which from_ymd_opt(year, 1, 1) would otherwise accept
    NaiveDate::from_ymd_opt(year, month, 1)?;
    first_of_next.pred_opt().map(|d| d.day())
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if !prefix.bytes().all(|b| b.is_ascii_digit())
        || !ACCEPTED_PREFIX_LENGTHS.contains(&prefix.len())
    {
        return Err(Error::config(format!(
            "date '{prefix}' must be yyyy[MM[dd[hh[mm[ss]]]]] (4 to 14 digits)"
        )));
    }
    Ok(())
}

fn parse_digits<T: std::str::FromStr>(digits: &str, prefix: &str) -> Result<T> {
    digits.parse().map_err(|_| invalid_date(prefix))
}

fn ensure_valid(prefix: &str, expanded: String) -> Result<String> {
    match parse_timestamp(&expanded) {
        Some(_) => Ok(expanded),
        None => Err(invalid_date(prefix)),
    }
}

fn invalid_date(prefix: &str) -> Error {
    Error::config(format!("date '{prefix}' does not name a valid calendar date"))
}

//! Date and time parsing for spreadsheet cells.
//!
//! Workbook cells carry dates as serial day numbers in the 1900 date system,
//! where serial 1 is 1900-01-01 and serial 60 is the nonexistent 1900-02-29.
//! Free-text cells go through a list of common layouts. Nothing here fails:
//! unparseable input becomes `None` (dates) or an empty string (times).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

/// Converts a workbook serial into a calendar date. Only the whole-day part is used.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.floor() as i64;

    // 1900 被誤當成閏年：60 之前的序號少算一天
    let (epoch, offset) = match days {
        d if d < 60 => (NaiveDate::from_ymd_opt(1899, 12, 31)?, d),
        60 => return NaiveDate::from_ymd_opt(1900, 2, 28),
        d => (NaiveDate::from_ymd_opt(1899, 12, 30)?, d),
    };
    epoch.checked_add_signed(Duration::try_days(offset)?)
}

pub fn parse_date_str(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // 四位數字視為年份，不當序號
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse::<i32>().ok().and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
    }

    if let Ok(serial) = text.parse::<f64>() {
        return from_serial(serial);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
}

/// Parses a cell value as a date, returning `None` when nothing fits.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_serial),
        Value::String(s) => parse_date_str(s),
        _ => None,
    }
}

fn fraction_to_hhmm(day_fraction: f64) -> String {
    let fraction = day_fraction.fract().abs();
    let total_minutes = (fraction * 24.0 * 60.0).round() as i64 % (24 * 60);
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

/// Formats a time-of-day cell as `HH:MM`.
///
/// Numbers are fractions of a day (a full date-time serial keeps only its
/// fractional part). Strings containing `:` pass through untouched.
pub fn parse_time(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(fraction_to_hhmm).unwrap_or_default(),
        Value::String(s) if s.contains(':') => s.clone(),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(fraction_to_hhmm)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

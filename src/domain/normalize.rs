//! Normalization of heterogeneous date and number tokens.
//!
//! Source files arrive with ISO dates, slash- or dash-delimited
//! day/month/year dates, raw spreadsheet serial numbers, and prices
//! decorated with currency symbols or thousands separators. Everything
//! funnels through here into canonical values; a token that cannot be
//! normalized yields `None`, never a panic.

use chrono::{Duration, NaiveDate};

use super::record::PriceRecord;

/// Spreadsheet epoch: serial 1 = 1899-12-31.
fn serial_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap()
}

/// Fallback formats tried after the structured rules.
const FALLBACK_FORMATS: &[&str] = &["%Y/%m/%d", "%Y%m%d", "%d %b %Y", "%B %d, %Y"];

/// Parse an arbitrary date token into a calendar date.
///
/// Priority order: exact ISO, all-digit spreadsheet serial, delimited
/// day/month/year, then a short list of fallback formats.
pub fn parse_date_token(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Some(date);
    }

    if token.chars().all(|c| c.is_ascii_digit()) && token.len() <= 6 {
        let serial: i64 = token.parse().ok()?;
        if serial > 0 {
            return serial_anchor().checked_add_signed(Duration::days(serial));
        }
        return None;
    }

    if let Some(date) = parse_delimited(token) {
        return Some(date);
    }

    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

/// `D/M/Y` or `D-M-Y` with a 2- or 4-digit year. When the first
/// component exceeds 12 the larger of the first two is taken as the
/// day, which also rescues month-first exports.
fn parse_delimited(token: &str) -> Option<NaiveDate> {
    let sep = if token.contains('/') {
        '/'
    } else if token.contains('-') {
        '-'
    } else {
        return None;
    };

    let parts: Vec<&str> = token.split(sep).collect();
    if parts.len() != 3 {
        return None;
    }

    let a: u32 = parts[0].trim().parse().ok()?;
    let b: u32 = parts[1].trim().parse().ok()?;
    let year_raw: i32 = parts[2].trim().parse().ok()?;

    let year = match parts[2].trim().len() {
        4 => year_raw,
        2 => {
            if year_raw < 70 {
                2000 + year_raw
            } else {
                1900 + year_raw
            }
        }
        _ => return None,
    };

    let (day, month) = if a > 12 { (a, b) } else if b > 12 { (b, a) } else { (a, b) };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a numeric token that may carry currency symbols or thousands
/// separators. Non-finite results are rejected.
pub fn parse_price_token(token: &str) -> Option<f64> {
    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Assemble a record from raw tokens. All-or-nothing: a row with an
/// unreadable date or a non-positive price is dropped whole.
pub fn normalize_row(date: &str, gold: &str, silver: &str) -> Option<PriceRecord> {
    let record = PriceRecord {
        date: parse_date_token(date)?,
        gold: parse_price_token(gold)?,
        silver: parse_price_token(silver)?,
    };
    record.is_valid().then_some(record)
}

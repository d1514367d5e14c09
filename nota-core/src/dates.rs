//! Date helpers: receipt/store date normalization and month labels.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Receipts are issued in Brazil; "today" is taken in this zone.
pub const RECEIPT_TZ: Tz = chrono_tz::America::Sao_Paulo;

/// Patterns accepted by [`normalize_date`]
pub const ACCEPTED_DATE_PATTERNS: &str = "DD/MM/YYYY or ISO-8601 (YYYY-MM-DD[THH:MM:SS...])";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized date '{input}': expected {expected}")]
pub struct DateFormatError {
    pub input: String,
    pub expected: &'static str,
}

/// Parse a receipt (`DD/MM/YYYY`) or store (ISO-8601) date into a calendar date.
///
/// Never guesses: anything else is a [`DateFormatError`].
pub fn normalize_date(s: &str) -> Result<NaiveDate, DateFormatError> {
    let t = s.trim();
    let err = || DateFormatError {
        input: s.to_string(),
        expected: ACCEPTED_DATE_PATTERNS,
    };

    if t.is_empty() {
        return Err(err());
    }

    if let Ok(d) = NaiveDate::parse_from_str(t, "%d/%m/%Y") {
        return Ok(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        // Calendar date as written; the store's zone is unknown, so no re-zoning
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Ok(ndt.date());
        }
    }

    Err(err())
}

/// Format a date the way receipts print it (`DD/MM/YYYY`)
pub fn to_receipt_format(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Format a date for the store boundary (`YYYY-MM-DD`)
pub fn to_store_format(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Current calendar date in the receipt zone
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&RECEIPT_TZ).date_naive()
}

const MONTHS_PT: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// "Month YYYY" label in pt-BR, e.g. `Março 2025`
pub fn month_label(date: NaiveDate) -> String {
    format!("{} {}", MONTHS_PT[date.month0() as usize], date.year())
}

/// Sortable (year, month) key for a date
pub fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

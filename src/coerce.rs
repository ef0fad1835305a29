use chrono::{NaiveDate, NaiveDateTime};

use crate::workbook::{excel_serial_to_datetime, Cell};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

// Two-digit years go first: `%Y` would otherwise read "25" as year 25.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%y", "%d.%m.%Y", "%Y/%m/%d", "%m/%d/%Y"];

/// Coerce a cell to a calendar date. `None` means the row has no usable date.
pub fn to_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(dt) => Some(dt.date()),
        Cell::Number(n) => excel_serial_to_datetime(*n).map(|dt| dt.date()),
        Cell::Text(s) => parse_date_text(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Coerce a cell to a number; anything unconvertible is zero.
pub fn to_number(cell: &Cell) -> f64 {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => parse_number_text(s),
        Cell::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Cell::Empty | Cell::Date(_) => 0.0,
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Coerce a cell to a count: rounded, with negatives treated as unconvertible.
pub fn to_count(cell: &Cell) -> u64 {
    let value = to_number(cell).round();
    if value > 0.0 {
        value as u64
    } else {
        0
    }
}

pub fn parse_number_text(raw: &str) -> f64 {
    let mut s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .collect();
    for mark in ["₽", "$", "руб.", "руб", "р."] {
        s = s.replace(mark, "");
    }
    let s = if s.contains('.') {
        s.replace(',', "")
    } else if s.matches(',').count() == 1 && !is_thousands_group(&s) {
        s.replace(',', ".")
    } else {
        s.replace(',', "")
    };
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -inner.parse::<f64>().unwrap_or(0.0);
    }
    s.parse().unwrap_or(0.0)
}

/// A lone comma reads as a thousands separator when exactly three digits
/// follow it and one to three digits without a leading zero precede it.
fn is_thousands_group(s: &str) -> bool {
    let Some((int, frac)) = s.split_once(',') else {
        return false;
    };
    let int = int.trim_start_matches(['-', '(']);
    let frac = frac.trim_end_matches(')');
    (1..=3).contains(&int.len())
        && !int.starts_with('0')
        && int.chars().all(|c| c.is_ascii_digit())
        && frac.len() == 3
        && frac.chars().all(|c| c.is_ascii_digit())
}

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::domain::entities::institution::ColumnKind;

const MISSING: &str = "-";

/// Digits grouped in threes with commas, e.g. `1234567` becomes `1,234,567`.
pub fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// en-US style number with at most `max_fraction` decimals, trailing zeros trimmed.
pub fn format_number(value: f64, max_fraction: usize) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    let fixed = format!("{:.*}", max_fraction, value.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');
    let sign = if value < 0.0 && fixed.chars().any(|ch| ch.is_ascii_digit() && ch != '0') {
        "-"
    } else {
        ""
    };
    if fraction.is_empty() {
        format!("{sign}{}", group_thousands(integer))
    } else {
        format!("{sign}{}.{fraction}", group_thousands(integer))
    }
}

pub fn format_usd(value: f64) -> String {
    let whole = format_number(value.round(), 0);
    match whole.strip_prefix('-') {
        Some(rest) => format!("-${rest}"),
        None => format!("${whole}"),
    }
}

/// Reported amounts are in thousands of dollars.
pub fn format_thousands_currency(value: f64) -> String {
    format_usd(value * 1000.0)
}

/// Thousands-of-dollars totals shown as whole millions.
pub fn format_millions_currency(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "$0 Million".to_string();
    }
    format!("{} Million", format_usd(value / 1000.0))
}

pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// ISO instants, `YYYY-MM-DD`, and `YYYYMMDD` render as `M/D/YYYY`; anything
/// else is shown unchanged.
pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return MISSING.to_string();
    }
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y%m%d").ok())
        .or_else(|| NaiveDate::parse_from_str(raw, "%m/%d/%Y").ok())
        .or_else(|| raw.get(..10).and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()));
    match date {
        Some(date) => date.format("%-m/%-d/%Y").to_string(),
        None => raw.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub fn format_cell(kind: ColumnKind, value: Option<&Value>) -> String {
    let Some(value) = value.filter(|value| !value.is_null()) else {
        return MISSING.to_string();
    };
    match kind {
        ColumnKind::Currency => as_number(value).map_or(MISSING.to_string(), format_thousands_currency),
        ColumnKind::Percent => as_number(value).map_or(MISSING.to_string(), format_percent),
        ColumnKind::Number => as_number(value).map_or(MISSING.to_string(), |number| format_number(number, 3)),
        ColumnKind::Date => match value {
            Value::String(text) => format_date(text),
            other => other.to_string(),
        },
        ColumnKind::Text => match value {
            Value::String(text) if text.trim().is_empty() => MISSING.to_string(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}

/// Comparison cells: locale-grouped value, or `-` when nothing was reported.
pub fn format_reported(value: Option<f64>) -> String {
    value.map_or(MISSING.to_string(), |number| format_number(number, 3))
}

pub fn cell_align(kind: ColumnKind) -> &'static str {
    if kind.is_numeric() {
        "right"
    } else {
        "left"
    }
}

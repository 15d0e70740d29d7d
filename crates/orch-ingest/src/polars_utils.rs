//! `AnyValue` stringification/coercion helpers, adapted from the teacher's
//! `sdtm_ingest::polars_utils`.

use polars::prelude::AnyValue;

/// Renders any scalar as a display string. Null becomes an empty string.
pub fn any_to_string(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Float64(f) => format_numeric(*f),
        AnyValue::Float32(f) => format_numeric(f64::from(*f)),
        other => other.to_string(),
    }
}

/// Same as [`any_to_string`] but returns `None` for null or blank values.
pub fn any_to_string_non_empty(value: &AnyValue) -> Option<String> {
    let rendered = any_to_string(value);
    if rendered.trim().is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/// Formats a float without a trailing `.0` for integral values, matching
/// how SAS-style numerics are usually transcribed in submission datasets.
pub fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let mut rendered = format!("{value}");
        if rendered.contains('e') || rendered.contains('E') {
            rendered = format!("{value:.6}");
        }
        rendered
    }
}

pub fn any_to_f64(value: &AnyValue) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Float64(f) => Some(*f),
        AnyValue::Float32(f) => Some(f64::from(*f)),
        AnyValue::Int64(i) => Some(*i as f64),
        AnyValue::Int32(i) => Some(f64::from(*i)),
        AnyValue::UInt64(i) => Some(*i as f64),
        AnyValue::UInt32(i) => Some(f64::from(*i)),
        AnyValue::String(s) => parse_f64(s),
        AnyValue::StringOwned(s) => parse_f64(s.as_str()),
        _ => None,
    }
}

pub fn any_to_i64(value: &AnyValue) -> Option<i64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int64(i) => Some(*i),
        AnyValue::Int32(i) => Some(i64::from(*i)),
        AnyValue::UInt64(i) => Some(*i as i64),
        AnyValue::UInt32(i) => Some(i64::from(*i)),
        AnyValue::Float64(f) if f.fract() == 0.0 => Some(*f as i64),
        AnyValue::String(s) => parse_i64(s),
        AnyValue::StringOwned(s) => parse_i64(s.as_str()),
        _ => None,
    }
}

fn parse_f64(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        trimmed.parse::<f64>().ok()
    }
}

fn parse_i64(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        trimmed.parse::<i64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_integral_floats_without_decimal() {
        assert_eq!(format_numeric(3.0), "3");
        assert_eq!(format_numeric(3.5), "3.5");
    }

    #[test]
    fn null_string_is_empty_not_none_marker() {
        assert_eq!(any_to_string(&AnyValue::Null), "");
        assert_eq!(any_to_string_non_empty(&AnyValue::Null), None);
    }

    #[test]
    fn coerces_numeric_strings() {
        let v = AnyValue::StringOwned("42".into());
        assert_eq!(any_to_i64(&v), Some(42));
        assert_eq!(any_to_f64(&v), Some(42.0));
    }

    #[test]
    fn blank_string_coerces_to_none() {
        let v = AnyValue::StringOwned("  ".into());
        assert_eq!(any_to_i64(&v), None);
        assert_eq!(any_to_f64(&v), None);
    }
}

//! Lenient readers for loosely typed JSON fields.
//!
//! Devices and operator tools send numbers as JSON numbers or as numeric
//! strings, and timestamps with or without an offset. The ingestor and the
//! HTTP layer share these helpers so both accept the same inputs.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Naive layouts accepted after RFC 3339 fails; read as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Integer from a JSON number or numeric string.
///
/// Whole-number floats such as `5.0` count as integers. Fractional floats,
/// booleans and everything else are `None`.
pub fn int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// i64::MIN and i64::MAX + 1 are both exact in f64.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

#[allow(clippy::cast_possible_truncation)]
fn whole(f: f64) -> Option<i64> {
    let in_range = (I64_LOWER..I64_UPPER).contains(&f);
    (in_range && f.fract() == 0.0).then(|| f as i64)
}

/// Float from a JSON number or numeric string.
pub fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn ints_from_numbers_and_strings() {
        assert_eq!(int(&json!(7)), Some(7));
        assert_eq!(int(&json!(-3)), Some(-3));
        assert_eq!(int(&json!(" 12 ")), Some(12));
        assert_eq!(int(&json!(4.0)), Some(4));
        assert_eq!(int(&json!(-2.0)), Some(-2));
        assert_eq!(int(&json!(4.5)), None);
        assert_eq!(int(&json!(1e300)), None);
        assert_eq!(int(&json!("x")), None);
        assert_eq!(int(&json!(true)), None);
        assert_eq!(int(&Value::Null), None);
    }

    #[test]
    fn floats_from_numbers_and_strings() {
        assert_eq!(float(&json!(21.5)), Some(21.5));
        assert_eq!(float(&json!("19.25")), Some(19.25));
        assert_eq!(float(&json!([])), None);
    }

    #[test]
    fn rfc3339_offsets_are_normalized() {
        let ts = timestamp("2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        assert!(timestamp("2024-05-01T08:00:00Z").is_some());
    }

    #[test]
    fn naive_values_are_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(timestamp("2024-05-01T08:00:00").unwrap(), expected);
        assert_eq!(timestamp("2024-05-01 08:00:00").unwrap(), expected);
        assert!(timestamp("2024-05-01T08:00:00.250").is_some());
    }

    #[test]
    fn garbage_is_none() {
        assert!(timestamp("yesterday").is_none());
        assert!(timestamp("").is_none());
    }
}

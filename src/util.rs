/// Utility helpers used by the collector and the dashboard.
///
/// This module contains:
/// - KST civil-time helpers
/// - Timestamp wire format (de)serialization
/// - Lenient numeric extraction from exchange JSON
///
/// IMPORTANT:
/// - No exchange-specific logic should live here.
/// - Everything in this module must stay deterministic given its inputs.
///

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use serde_json::Value;

/// KST is a fixed UTC+09:00 offset (no daylight saving).
const KST_OFFSET_HOURS: i64 = 9;

/// Wire format for `datetime_kst` (exchange and store side).
pub const KST_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Filter bound format; keeps sub-second precision so `gte` stays exact.
pub const KST_BOUND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current KST civil time.
pub fn now_kst() -> NaiveDateTime {
    to_kst(Utc::now())
}

/// Converts an absolute instant into KST civil time.
pub fn to_kst(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.naive_utc() + Duration::hours(KST_OFFSET_HOURS)
}

/// Lower bound of a rolling read window ending at `now`.
///
/// Saturates at `NaiveDateTime::MIN` for windows beyond the calendar range.
pub fn window_threshold(now: NaiveDateTime, hours: u32) -> NaiveDateTime {
    now.checked_sub_signed(Duration::hours(i64::from(hours)))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Truncates a timestamp to the start of its hour.
///
/// Example: 2025-09-22 13:59:15 -> 2025-09-22 13:00:00
pub fn floor_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Parses a KST timestamp as written by the exchanges or the store.
///
/// Accepted inputs:
/// - "2025-09-22T13:00:00"            (naive, already KST)
/// - "2025-09-22T13:00:00.123"        (naive with fraction)
/// - "2025-09-22 13:00:00"            (space separator)
/// - "2025-09-22T04:00:00+00:00"      (offset; converted to KST)
pub fn parse_kst(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(to_kst(dt.with_timezone(&Utc)));
    }

    // Postgres renders timestamptz with a short "+00" offset.
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%#z") {
        return Some(to_kst(dt.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Extracts a finite, non-negative number from a JSON value.
///
/// Exchanges send plain numbers, PostgREST may render `numeric`
/// columns as strings.
pub fn non_negative_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    (n.is_finite() && n >= 0.0).then_some(n)
}

/// Symbol prefix for a quote currency filter ("krw" -> "KRW-").
pub fn quote_prefix(quote: &str) -> String {
    format!("{}-", quote.trim().to_uppercase())
}

/// Serde adapter for `datetime_kst` columns.
pub mod kst_datetime {
    use super::{parse_kst, KST_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(KST_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_kst(&raw).ok_or_else(|| de::Error::custom(format!("invalid datetime_kst: {raw}")))
    }
}

/// Serde adapter accepting numbers or numeric strings.
pub mod lenient_number {
    use serde::{de, Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let v = Value::deserialize(d)?;
        super::non_negative_number(&v)
            .ok_or_else(|| de::Error::custom(format!("invalid traded_price: {v}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 22)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    #[test]
    fn floors_to_hour() {
        assert_eq!(floor_hour(ts(13, 59, 15)), ts(13, 0, 0));
        assert_eq!(floor_hour(ts(0, 0, 0)), ts(0, 0, 0));
    }

    #[test]
    fn parses_naive_and_offset_timestamps() {
        assert_eq!(parse_kst("2025-09-22T13:00:00"), Some(ts(13, 0, 0)));
        assert_eq!(parse_kst("2025-09-22 13:00:00"), Some(ts(13, 0, 0)));
        assert_eq!(parse_kst("2025-09-22T04:00:00+00:00"), Some(ts(13, 0, 0)));
        assert_eq!(parse_kst("2025-09-22T13:00:00+09:00"), Some(ts(13, 0, 0)));
        assert_eq!(parse_kst("not a date"), None);
    }

    #[test]
    fn threshold_moves_back_by_hours() {
        assert_eq!(window_threshold(ts(13, 0, 0), 13), ts(0, 0, 0));
    }

    #[test]
    fn oversized_window_saturates_instead_of_panicking() {
        assert_eq!(window_threshold(ts(13, 0, 0), u32::MAX), NaiveDateTime::MIN);
    }

    #[test]
    fn bound_format_keeps_fraction() {
        let bound = ts(13, 0, 0) + Duration::milliseconds(500);
        assert_eq!(
            bound.format(KST_BOUND_FORMAT).to_string(),
            "2025-09-22T13:00:00.500000"
        );
    }

    #[test]
    fn numbers_must_be_finite_and_non_negative() {
        assert_eq!(non_negative_number(&json!(12.5)), Some(12.5));
        assert_eq!(non_negative_number(&json!("1000")), Some(1000.0));
        assert_eq!(non_negative_number(&json!(-1)), None);
        assert_eq!(non_negative_number(&json!(null)), None);
    }

    #[test]
    fn quote_prefix_is_uppercased() {
        assert_eq!(quote_prefix("krw"), "KRW-");
    }
}

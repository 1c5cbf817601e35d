//! Timestamp handling for submitted events.
//!
//! Browsers send `new Date()` serialized as an ISO 8601 string, while other
//! producers tend to send `Date.now()` style epoch numbers. Both are accepted.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Errors that can occur during timestamp parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// The input type is not supported.
    #[error("Unsupported timestamp type: expected string or number")]
    UnsupportedType,

    /// The timestamp string is empty.
    #[error("Empty timestamp string")]
    EmptyString,

    /// The timestamp value is invalid.
    #[error("Invalid timestamp: {0}")]
    InvalidFormat(String),

    /// Nanosecond precision is not supported.
    #[error("Nanosecond precision timestamps are not supported")]
    NanosecondPrecision,
}

/// Detected precision of a Unix timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnixPrecision {
    /// Seconds (<=10 digits)
    Seconds,
    /// Milliseconds (<=13 digits)
    Milliseconds,
    /// Microseconds (<=16 digits)
    Microseconds,
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Detects the precision of a Unix timestamp based on digit count.
///
/// # Errors
///
/// Returns `TimestampError::NanosecondPrecision` if the timestamp has more than 16 digits.
pub fn detect_unix_precision(timestamp: f64) -> Result<UnixPrecision, TimestampError> {
    let int_part = timestamp.abs().trunc() as i64;
    let digit_count = if int_part == 0 {
        1
    } else {
        int_part.to_string().len()
    };

    match digit_count {
        0..=10 => Ok(UnixPrecision::Seconds),
        11..=13 => Ok(UnixPrecision::Milliseconds),
        14..=16 => Ok(UnixPrecision::Microseconds),
        _ => Err(TimestampError::NanosecondPrecision),
    }
}

/// Interprets a JSON timestamp value.
///
/// Strings are parsed as ISO 8601 / RFC 3339 (or a bare number), numbers as
/// Unix timestamps with automatic precision detection.
pub fn parse_timestamp_value(value: &serde_json::Value) -> Result<Timestamp, TimestampError> {
    match value {
        serde_json::Value::String(s) => parse_timestamp(s),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| TimestampError::InvalidFormat(n.to_string()))
            .and_then(parse_unix_timestamp),
        _ => Err(TimestampError::UnsupportedType),
    }
}

/// Parses a timestamp string.
///
/// # Errors
///
/// Returns `TimestampError` if the input cannot be parsed.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, TimestampError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(TimestampError::EmptyString);
    }

    if let Ok(num) = trimmed.parse::<f64>() {
        return parse_unix_timestamp(num);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Offset-less forms are taken as UTC
    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(TimestampError::InvalidFormat(trimmed.to_string()))
}

/// Parses a Unix timestamp with automatic precision detection.
pub fn parse_unix_timestamp(value: f64) -> Result<Timestamp, TimestampError> {
    if !value.is_finite() {
        return Err(TimestampError::InvalidFormat(value.to_string()));
    }

    let has_fraction = (value - value.trunc()).abs() > f64::EPSILON;
    if has_fraction {
        let secs = value.trunc() as i64;
        let nanos = (value.fract().abs() * 1_000_000_000.0) as u32;
        return Utc
            .timestamp_opt(secs, nanos)
            .single()
            .ok_or_else(|| TimestampError::InvalidFormat(value.to_string()));
    }

    let whole = value as i64;
    let parsed = match detect_unix_precision(value)? {
        UnixPrecision::Seconds => Utc.timestamp_opt(whole, 0).single(),
        UnixPrecision::Milliseconds => Utc.timestamp_millis_opt(whole).single(),
        UnixPrecision::Microseconds => Utc.timestamp_micros(whole).single(),
    };

    parsed.ok_or_else(|| TimestampError::InvalidFormat(value.to_string()))
}

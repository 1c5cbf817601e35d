//! Utility functions for timestamp handling.

pub mod timestamps;

pub use timestamps::{
    now_utc, parse_timestamp, parse_timestamp_value, Timestamp, TimestampError, UnixPrecision,
};

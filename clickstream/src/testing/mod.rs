//! Testing utilities for the ingestion queue.
//!
//! This module provides:
//! - Mock sinks with scripted failures, delays and panics
//! - Outcome assertions
//! - Canned event records and payloads

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_closed, assert_exhausted, assert_succeeded};
pub use fixtures::{
    click_event, click_payload, mousemove_event, numbered_clicks, scroll_event, submission,
};
pub use mocks::{FailingSink, FlakySink, PanickingSink, RecordingSink, SlowSink};

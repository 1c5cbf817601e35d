//! Canned records for tests.

use serde_json::json;

use crate::core::{EventRecord, EventSubmission, EventType};

/// The click a browser tracker sends for a test button.
#[must_use]
pub fn click_event() -> EventRecord {
    EventRecord::click("BUTTON#test-btn-1", 10.0, 20.0)
}

/// A scroll to 450px.
#[must_use]
pub fn scroll_event() -> EventRecord {
    EventRecord::scroll(450.0)
}

/// A pointer move on the page body.
#[must_use]
pub fn mousemove_event() -> EventRecord {
    EventRecord::builder(EventType::MouseMove)
        .element("BODY")
        .position(300.0, 150.0)
        .path("/")
        .build()
}

/// `count` clicks with elements `click-0`, `click-1`, ...
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn numbered_clicks(count: usize) -> Vec<EventRecord> {
    (0..count)
        .map(|i| EventRecord::click(format!("click-{i}"), i as f64, 0.0))
        .collect()
}

/// A well-formed JSON body for the ingestion endpoint.
#[must_use]
pub fn click_payload() -> serde_json::Value {
    json!({
        "type": "click",
        "element": "BUTTON#test-btn-1",
        "x": 10,
        "y": 20,
        "timestamp": "2026-03-01T12:00:00Z",
        "path": "/checkout"
    })
}

/// Parses a JSON payload as a submission.
///
/// # Panics
///
/// Panics if the payload does not have the submission shape.
#[must_use]
pub fn submission(payload: serde_json::Value) -> EventSubmission {
    serde_json::from_value(payload).expect("payload should deserialize as a submission")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_validate() {
        let record = submission(click_payload()).validate().unwrap();
        assert_eq!(record.event_type(), EventType::Click);
        assert_eq!(record.x(), Some(10.0));
        assert_eq!(mousemove_event().element(), "BODY");
        assert_eq!(numbered_clicks(3)[2].element(), "click-2");
    }
}

//! Interaction event records and their wire-level submission form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;
use crate::utils::{now_utc, parse_timestamp_value, Timestamp};

/// Element identifier used when the producer does not name a DOM target.
pub const UNKNOWN_ELEMENT: &str = "N/A";

/// The kind of interaction captured in the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A click on a DOM element.
    Click,
    /// A change in vertical scroll offset.
    Scroll,
    /// A pointer movement.
    #[serde(rename = "mousemove")]
    MouseMove,
}

impl EventType {
    /// Every supported event type.
    pub const ALL: [Self; 3] = [Self::Click, Self::Scroll, Self::MouseMove];

    /// Returns the wire name of the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Scroll => "scroll",
            Self::MouseMove => "mousemove",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownEventType(s.to_string()))
    }
}

/// An immutable interaction event.
///
/// Records are built once, through [`EventRecord::builder`] or by validating
/// an [`EventSubmission`], and are never mutated afterwards. The queue wraps
/// them in a task for retry bookkeeping but hands the Sink the record as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(default = "default_element")]
    element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scroll_position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    timestamp: Timestamp,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

fn default_element() -> String {
    UNKNOWN_ELEMENT.to_string()
}

impl EventRecord {
    /// Starts building a record of the given type.
    #[must_use]
    pub fn builder(event_type: EventType) -> EventRecordBuilder {
        EventRecordBuilder::new(event_type)
    }

    /// Creates a click record at the given coordinates.
    #[must_use]
    pub fn click(element: impl Into<String>, x: f64, y: f64) -> Self {
        Self::builder(EventType::Click)
            .element(element)
            .position(x, y)
            .build()
    }

    /// Creates a scroll record at the given vertical offset.
    #[must_use]
    pub fn scroll(scroll_position: f64) -> Self {
        Self::builder(EventType::Scroll)
            .scroll_position(scroll_position)
            .build()
    }

    /// Creates a pointer-movement record.
    #[must_use]
    pub fn mouse_move(x: f64, y: f64) -> Self {
        Self::builder(EventType::MouseMove).position(x, y).build()
    }

    /// The interaction kind.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The DOM target identifier, or `"N/A"`.
    #[must_use]
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Horizontal screen coordinate.
    #[must_use]
    pub fn x(&self) -> Option<f64> {
        self.x
    }

    /// Vertical screen coordinate.
    #[must_use]
    pub fn y(&self) -> Option<f64> {
        self.y
    }

    /// Vertical scroll offset.
    #[must_use]
    pub fn scroll_position(&self) -> Option<f64> {
        self.scroll_position
    }

    /// The page route the event originated from.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// When the event happened, or when it was accepted if the producer did not say.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Uninterpreted producer metadata.
    #[must_use]
    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }
}

/// Builder for [`EventRecord`].
#[derive(Debug, Clone)]
pub struct EventRecordBuilder {
    event_type: EventType,
    element: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    scroll_position: Option<f64>,
    path: Option<String>,
    timestamp: Option<Timestamp>,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl EventRecordBuilder {
    fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            element: None,
            x: None,
            y: None,
            scroll_position: None,
            path: None,
            timestamp: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Sets the DOM target identifier.
    #[must_use]
    pub fn element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Sets both screen coordinates.
    #[must_use]
    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Sets the vertical scroll offset.
    #[must_use]
    pub fn scroll_position(mut self, offset: f64) -> Self {
        self.scroll_position = Some(offset);
        self
    }

    /// Sets the originating page route.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the event time.
    #[must_use]
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn metadata_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Finishes the record, filling defaults for anything left unset.
    #[must_use]
    pub fn build(self) -> EventRecord {
        EventRecord {
            event_type: self.event_type,
            element: self.element.unwrap_or_else(default_element),
            x: self.x,
            y: self.y,
            scroll_position: self.scroll_position,
            path: self.path,
            timestamp: self.timestamp.unwrap_or_else(now_utc),
            metadata: self.metadata,
        }
    }
}

/// An event as submitted by a producer, before validation.
///
/// Every field is optional on the wire so that a missing or unknown `type`
/// surfaces as a [`ValidationError`] rather than a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubmission {
    /// Event kind name.
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// DOM target identifier.
    pub element: Option<String>,
    /// Horizontal coordinate.
    pub x: Option<f64>,
    /// Vertical coordinate.
    pub y: Option<f64>,
    /// Vertical scroll offset.
    pub scroll_position: Option<f64>,
    /// Page route.
    pub path: Option<String>,
    /// ISO 8601 string or Unix epoch number.
    pub timestamp: Option<serde_json::Value>,
    /// Free-form metadata object.
    pub metadata: Option<serde_json::Value>,
}

impl EventSubmission {
    /// Validates the submission and turns it into an immutable record.
    pub fn validate(self) -> Result<EventRecord, ValidationError> {
        let event_type: EventType = self
            .event_type
            .as_deref()
            .ok_or(ValidationError::MissingField("type"))?
            .parse()?;

        let mut builder = EventRecord::builder(event_type);

        if let Some(element) = self.element {
            builder = builder.element(element);
        }
        builder.x = self.x;
        builder.y = self.y;
        builder.scroll_position = self.scroll_position;
        if let Some(path) = self.path {
            builder = builder.path(path);
        }

        match self.timestamp {
            None | Some(serde_json::Value::Null) => {}
            Some(value) => {
                let timestamp = parse_timestamp_value(&value)
                    .map_err(|e| ValidationError::InvalidTimestamp(e.to_string()))?;
                builder = builder.timestamp(timestamp);
            }
        }

        match self.metadata {
            None | Some(serde_json::Value::Null) => {}
            Some(serde_json::Value::Object(map)) => builder.metadata = map,
            Some(other) => {
                return Err(ValidationError::InvalidField {
                    field: "metadata",
                    reason: format!("expected an object, got {other}"),
                });
            }
        }

        Ok(builder.build())
    }
}

impl TryFrom<serde_json::Value> for EventRecord {
    type Error = ValidationError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let submission: EventSubmission = serde_json::from_value(value)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        submission.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_event_type_round_trips_wire_names() {
        for event_type in EventType::ALL {
            assert_eq!(event_type.as_str().parse::<EventType>().unwrap(), event_type);
        }
        assert_eq!(
            serde_json::to_value(EventType::MouseMove).unwrap(),
            json!("mousemove")
        );
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        assert_eq!(
            "hover".parse::<EventType>(),
            Err(ValidationError::UnknownEventType("hover".to_string()))
        );
    }

    #[test]
    fn test_click_defaults() {
        let record = EventRecord::builder(EventType::Click).build();
        assert_eq!(record.element(), UNKNOWN_ELEMENT);
        assert!(record.metadata().is_empty());
        assert!(record.path().is_none());
    }

    #[test]
    fn test_submission_validates_click() {
        let record = EventRecord::try_from(json!({
            "type": "click",
            "element": "BUTTON#test-btn-1",
            "x": 10,
            "y": 20,
            "path": "/",
            "timestamp": "2024-05-01T12:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(record.event_type(), EventType::Click);
        assert_eq!(record.element(), "BUTTON#test-btn-1");
        assert_eq!(record.x(), Some(10.0));
        assert_eq!(record.y(), Some(20.0));
        assert_eq!(record.path(), Some("/"));
        assert_eq!(record.timestamp().year(), 2024);
    }

    #[test]
    fn test_submission_missing_type() {
        let err = EventRecord::try_from(json!({"x": 1})).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("type"));
    }

    #[test]
    fn test_submission_rejects_unknown_type() {
        let err = EventRecord::try_from(json!({"type": "keypress"})).unwrap_err();
        assert_eq!(err, ValidationError::UnknownEventType("keypress".to_string()));
    }

    #[test]
    fn test_submission_rejects_non_object_metadata() {
        let err = EventRecord::try_from(json!({"type": "scroll", "metadata": [1, 2]})).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "metadata", .. }));
    }

    #[test]
    fn test_submission_rejects_bad_timestamp() {
        let err = EventRecord::try_from(json!({"type": "scroll", "timestamp": "soon"})).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_submission_malformed_coordinates() {
        let err = EventRecord::try_from(json!({"type": "click", "x": "left"})).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = EventRecord::builder(EventType::Scroll)
            .scroll_position(450.0)
            .path("/pricing")
            .metadata_entry("viewport", json!("mobile"))
            .build();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "scroll");
        assert_eq!(value["scrollPosition"], 450.0);
        assert_eq!(value["element"], "N/A");
        assert_eq!(value["metadata"]["viewport"], "mobile");
        assert!(value.get("x").is_none());
    }
}

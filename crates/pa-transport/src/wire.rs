//! Text encoding of events for the backend.
//!
//! The backend takes every field as text: numeric values are formatted by
//! the client and enums travel as their integer codes. Which fields are
//! present depends on the event kind.

use chrono::SecondsFormat;
use pa_core::{Event, EventKind, GestureType};
use serde::Serialize;

/// One event as the backend receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireRecord {
    #[serde(skip)]
    pub kind: EventKind,
    pub unique_identifier: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interacted_object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesture_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    pub timestamp: String,
}

impl WireRecord {
    /// Backend route segment. Holds share the gesture route.
    pub const fn route(&self) -> &'static str {
        match self.kind {
            EventKind::Gesture | EventKind::Hold => "gesture",
            other => other.as_str(),
        }
    }
}

impl From<&Event> for WireRecord {
    fn from(event: &Event) -> Self {
        let mut record = Self {
            kind: event.kind,
            unique_identifier: event.identifier.clone(),
            value: format_value(event.value.get()),
            interacted_object: None,
            gesture_type: None,
            hold_length: None,
            measurement: None,
            formula: None,
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        match event.kind {
            EventKind::Gaze | EventKind::Gain | EventKind::Loss => {}
            EventKind::Keyword => {
                record.interacted_object = Some(event.subject_str().to_string());
            }
            EventKind::Gesture | EventKind::Hold => {
                // Gestures are counted once; the magnitude travels as hold length.
                record.value = format_value(1.0);
                record.gesture_type =
                    Some(event.gesture.unwrap_or(GestureType::Tap).code().to_string());
                record.interacted_object = Some(event.subject_str().to_string());
                record.hold_length = Some(format_value(event.value.get()));
            }
            EventKind::CustomStat => {
                record.measurement = Some(event.measurement.code().to_string());
                record.formula = Some(event.formula.code().to_string());
                record.interacted_object = Some(event.subject_str().to_string());
            }
        }

        record
    }
}

/// Formats a value the way the backend parses floats: whole numbers keep
/// one decimal place.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};
    use pa_core::{Formula, Measurement, SubjectId, Value};

    fn ts() -> DateTime<Utc> {
        "2025-03-04T05:06:07Z".parse().unwrap()
    }

    #[test]
    fn format_value_keeps_one_decimal_for_whole_numbers() {
        assert_eq!(format_value(1.0), "1.0");
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(2.25), "2.25");
        assert_eq!(format_value(-3.0), "-3.0");
    }

    #[test]
    fn gaze_carries_identifier_and_value_only() {
        let event = Event::gaze(SubjectId::new("Cube").unwrap(), Value::new(2.5).unwrap(), ts());
        let record = WireRecord::from(&event);
        assert_eq!(record.route(), "gaze");
        assert_eq!(record.unique_identifier, "Cube");
        assert_eq!(record.value, "2.5");
        assert_eq!(record.interacted_object, None);
        assert_eq!(record.timestamp, "2025-03-04T05:06:07.000Z");
    }

    #[test]
    fn hold_uses_gesture_route_with_hold_length() {
        let event = Event::gesture(
            "Door",
            SubjectId::new("Door").unwrap(),
            GestureType::Hold,
            Value::new(1.5).unwrap(),
            ts(),
        );
        let record = WireRecord::from(&event);
        assert_eq!(record.route(), "gesture");
        assert_eq!(record.value, "1.0");
        assert_eq!(record.gesture_type.as_deref(), Some("2"));
        assert_eq!(record.hold_length.as_deref(), Some("1.5"));
        assert_eq!(record.interacted_object.as_deref(), Some("Door"));
    }

    #[test]
    fn custom_stat_sends_policy_codes() {
        let event = Event::custom_stat(
            "Distance",
            Value::new(12.0).unwrap(),
            Measurement::Meter,
            Formula::Average,
            None,
            ts(),
        );
        let record = WireRecord::from(&event);
        assert_eq!(record.route(), "custom_stat");
        assert_eq!(record.measurement.as_deref(), Some("3"));
        assert_eq!(record.formula.as_deref(), Some("1"));
        assert_eq!(record.interacted_object.as_deref(), Some(""));
    }

    #[test]
    fn json_omits_fields_the_kind_does_not_use() {
        let event = Event::gain("Coins", Value::new(10.0).unwrap(), ts());
        let json = serde_json::to_value(WireRecord::from(&event)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "unique_identifier": "Coins",
                "value": "10.0",
                "timestamp": "2025-03-04T05:06:07.000Z",
            })
        );
    }
}

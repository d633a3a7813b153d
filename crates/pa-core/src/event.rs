//! Telemetry events and their aggregation policy enums.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{SubjectId, ValidationError, Value};

/// Generates `as_str`, `code`, `from_code`, `Display` and `FromStr` for a
/// fieldless policy enum. Codes follow declaration order and are what the
/// backend expects on the wire.
macro_rules! policy_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal {
            $( $(#[$vmeta:meta])* $variant:ident = ($code:literal, $text:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// String representation used in logs and JSON.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }

            /// Integer code sent to the backend.
            #[must_use]
            pub const fn code(&self) -> u8 {
                match self {
                    $( Self::$variant => $code ),+
                }
            }

            /// Parses a backend integer code.
            pub fn from_code(code: u8) -> Result<Self, ValidationError> {
                match code {
                    $( $code => Ok(Self::$variant), )+
                    _ => Err(ValidationError::InvalidCode {
                        field: $field_name,
                        value: code.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    _ => Err(ValidationError::InvalidCode {
                        field: $field_name,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

policy_enum!(
    /// How an event's value is measured.
    Measurement, "measurement" {
        #[default]
        Count = (0, "count"),
        Second = (1, "second"),
        Feet = (2, "feet"),
        Meter = (3, "meter"),
    }
);

policy_enum!(
    /// How the backend combines values sharing an identifier.
    Formula, "formula" {
        #[default]
        Total = (0, "total"),
        Average = (1, "average"),
    }
);

policy_enum!(
    /// The kind of gesture observed.
    GestureType, "gesture type" {
        #[default]
        Tap = (0, "tap"),
        DoubleTap = (1, "double_tap"),
        Hold = (2, "hold"),
    }
);

/// The kind of telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Gaze,
    Keyword,
    Gesture,
    Hold,
    CustomStat,
    Gain,
    Loss,
}

impl EventKind {
    /// String representation, also the backend route segment.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gaze => "gaze",
            Self::Keyword => "keyword",
            Self::Gesture => "gesture",
            Self::Hold => "hold",
            Self::CustomStat => "custom_stat",
            Self::Gain => "gain",
            Self::Loss => "loss",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A telemetry event, built by the recorder right before it is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Caller-supplied identifier: the gazed subject, keyword, stat or
    /// gesture identifier.
    pub identifier: String,
    /// The entity the user interacted with, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectId>,
    /// Magnitude in `measurement` units.
    pub value: Value,
    #[serde(default)]
    pub measurement: Measurement,
    #[serde(default)]
    pub formula: Formula,
    /// Set for gesture and hold events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gesture: Option<GestureType>,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// A gaze dwell of `seconds` on `subject`.
    pub fn gaze(subject: SubjectId, seconds: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::Gaze,
            identifier: subject.to_string(),
            subject: Some(subject),
            value: seconds,
            measurement: Measurement::Second,
            formula: Formula::Total,
            gesture: None,
            timestamp,
        }
    }

    /// A spoken keyword, counted once.
    pub fn keyword(
        keyword: impl Into<String>,
        subject: Option<SubjectId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EventKind::Keyword,
            identifier: keyword.into(),
            subject,
            value: Value::ONE,
            measurement: Measurement::Count,
            formula: Formula::Total,
            gesture: None,
            timestamp,
        }
    }

    /// A gesture. Holds become [`EventKind::Hold`] and are measured in seconds.
    pub fn gesture(
        identifier: impl Into<String>,
        subject: SubjectId,
        gesture: GestureType,
        hold_length: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let (kind, measurement) = match gesture {
            GestureType::Hold => (EventKind::Hold, Measurement::Second),
            GestureType::Tap | GestureType::DoubleTap => (EventKind::Gesture, Measurement::Count),
        };
        Self {
            kind,
            identifier: identifier.into(),
            subject: Some(subject),
            value: hold_length,
            measurement,
            formula: Formula::Total,
            gesture: Some(gesture),
            timestamp,
        }
    }

    /// A caller-defined stat.
    pub fn custom_stat(
        identifier: impl Into<String>,
        value: Value,
        measurement: Measurement,
        formula: Formula,
        subject: Option<SubjectId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EventKind::CustomStat,
            identifier: identifier.into(),
            subject,
            value,
            measurement,
            formula,
            gesture: None,
            timestamp,
        }
    }

    /// A resource gain.
    pub fn gain(identifier: impl Into<String>, value: Value, timestamp: DateTime<Utc>) -> Self {
        Self::resource(EventKind::Gain, identifier.into(), value, timestamp)
    }

    /// A resource loss.
    pub fn loss(identifier: impl Into<String>, value: Value, timestamp: DateTime<Utc>) -> Self {
        Self::resource(EventKind::Loss, identifier.into(), value, timestamp)
    }

    fn resource(
        kind: EventKind,
        identifier: String,
        value: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            identifier,
            subject: None,
            value,
            measurement: Measurement::Count,
            formula: Formula::Total,
            gesture: None,
            timestamp,
        }
    }

    /// The subject as a string slice, or `""` when there is none.
    pub fn subject_str(&self) -> &str {
        self.subject.as_ref().map_or("", SubjectId::as_str)
    }
}

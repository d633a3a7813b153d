//! Backend status codes and the catalog of their messages.
//!
//! Every transport call returns an integer status: `0` for success, `1..=11`
//! for the documented backend errors, anything else for an error the client
//! does not know about. Unknown codes are carried through rather than
//! rejected so a newer backend never crashes an older client.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A backend-reported error. `Display` is the catalog message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    #[error("Authentication did not succeed yet.")]
    AuthenticationPending,
    #[error("No Internet Connection.")]
    NoConnection,
    #[error("API key is invalid.")]
    InvalidApiKey,
    #[error("Message Encoding is invalid.")]
    InvalidEncoding,
    #[error("Must call startup function first.")]
    NotConfigured,
    #[error("Hold length parameter must contain float value.")]
    InvalidHoldLength,
    #[error("Data buffer is empty.")]
    EmptyBuffer,
    #[error("Value parameter must contain float value.")]
    InvalidValue,
    #[error("Measurement parameter must have the enum Measurement Type.")]
    InvalidMeasurement,
    #[error("Formula parameter must have the enum Formula Type.")]
    InvalidFormula,
    #[error("GestureType parameter must have the enum GestureType Type.")]
    InvalidGestureType,
    #[error("Unknown error (code {0}).")]
    Unknown(i32),
}

impl ErrorCode {
    /// All documented codes, in code order.
    pub const CATALOG: [Self; 11] = [
        Self::AuthenticationPending,
        Self::NoConnection,
        Self::InvalidApiKey,
        Self::InvalidEncoding,
        Self::NotConfigured,
        Self::InvalidHoldLength,
        Self::EmptyBuffer,
        Self::InvalidValue,
        Self::InvalidMeasurement,
        Self::InvalidFormula,
        Self::InvalidGestureType,
    ];

    /// The integer the backend uses for this error.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::AuthenticationPending => 1,
            Self::NoConnection => 2,
            Self::InvalidApiKey => 3,
            Self::InvalidEncoding => 4,
            Self::NotConfigured => 5,
            Self::InvalidHoldLength => 6,
            Self::EmptyBuffer => 7,
            Self::InvalidValue => 8,
            Self::InvalidMeasurement => 9,
            Self::InvalidFormula => 10,
            Self::InvalidGestureType => 11,
            Self::Unknown(code) => *code,
        }
    }

    /// Maps a nonzero backend code to an error. Codes outside the catalog
    /// become [`ErrorCode::Unknown`].
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::AuthenticationPending,
            2 => Self::NoConnection,
            3 => Self::InvalidApiKey,
            4 => Self::InvalidEncoding,
            5 => Self::NotConfigured,
            6 => Self::InvalidHoldLength,
            7 => Self::EmptyBuffer,
            8 => Self::InvalidValue,
            9 => Self::InvalidMeasurement,
            10 => Self::InvalidFormula,
            11 => Self::InvalidGestureType,
            other => Self::Unknown(other),
        }
    }
}

/// Looks up the message for a raw status code.
///
/// Code `0` is success; everything else goes through the catalog.
pub fn message_for(code: i32) -> String {
    Status::from_code(code).message()
}

/// Result of one transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Success,
    Failed(ErrorCode),
}

impl Status {
    /// Interprets a raw status code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        if code == 0 {
            Self::Success
        } else {
            Self::Failed(ErrorCode::from_code(code))
        }
    }

    /// The raw status code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed(err) => err.code(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The error, if this status is a failure.
    #[must_use]
    pub const fn error(&self) -> Option<ErrorCode> {
        match self {
            Self::Success => None,
            Self::Failed(err) => Some(*err),
        }
    }

    /// Human-readable message for this status.
    pub fn message(&self) -> String {
        match self {
            Self::Success => "Success.".to_string(),
            Self::Failed(err) => err.to_string(),
        }
    }
}

impl From<ErrorCode> for Status {
    fn from(err: ErrorCode) -> Self {
        Self::Failed(err)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.message())
    }
}

impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.code().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = i32::deserialize(deserializer)?;
        Ok(Self::from_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_success() {
        assert!(Status::from_code(0).is_success());
        assert_eq!(Status::Success.code(), 0);
        assert_eq!(Status::Success.error(), None);
    }

    #[test]
    fn catalog_codes_roundtrip() {
        for (idx, err) in ErrorCode::CATALOG.iter().enumerate() {
            let code = i32::try_from(idx + 1).unwrap();
            assert_eq!(err.code(), code);
            assert_eq!(ErrorCode::from_code(code), *err);
        }
    }

    #[test]
    fn invalid_api_key_message_is_exact() {
        assert_eq!(message_for(3), "API key is invalid.");
        assert_eq!(
            ErrorCode::AuthenticationPending.to_string(),
            "Authentication did not succeed yet."
        );
    }

    #[test]
    fn unknown_codes_are_kept() {
        let status = Status::from_code(42);
        assert_eq!(status, Status::Failed(ErrorCode::Unknown(42)));
        assert_eq!(status.code(), 42);
        assert_eq!(status.message(), "Unknown error (code 42).");

        let negative = Status::from_code(-1);
        assert_eq!(negative.code(), -1);
        assert!(!negative.is_success());
    }

    #[test]
    fn status_serializes_as_code() {
        let status = Status::Failed(ErrorCode::NotConfigured);
        assert_eq!(serde_json::to_string(&status).unwrap(), "5");
        let parsed: Status = serde_json::from_str("0").unwrap();
        assert!(parsed.is_success());
    }

    #[test]
    fn status_display_includes_code_and_message() {
        let status = Status::from(ErrorCode::NoConnection);
        assert_eq!(status.to_string(), "2 (No Internet Connection.)");
    }
}

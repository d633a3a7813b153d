//! Core domain logic for the Practical Analytics client.
//!
//! This crate contains the fundamental types and logic for:
//! - Events: what gets sent, with measurement and formula policy
//! - Status codes: the backend error catalog
//! - Stopwatches: gaze dwell and hold duration tracking
//! - Grouping: reporting many objects under one subject identifier

pub mod clock;
pub mod event;
pub mod grouping;
pub mod status;
pub mod stopwatch;
pub mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use event::{Event, EventKind, Formula, GestureType, Measurement};
pub use grouping::{SceneObject, SubjectOverride};
pub use status::{ErrorCode, Status};
pub use stopwatch::Stopwatch;
pub use types::{SubjectId, ValidationError, Value};

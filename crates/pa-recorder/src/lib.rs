//! Event recording for Practical Analytics.
//!
//! [`EventRecorder`] owns the gaze and hold timers, resolves which subject an
//! event belongs to, and hands finished events to a
//! [`Transport`](pa_transport::Transport). Problems go to a
//! [`DiagnosticsSink`] instead of the caller.

pub mod diagnostics;
pub mod interaction;
pub mod recorder;
pub mod scene;
pub mod slot;

pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticsSink, TracingSink};
pub use interaction::Interactions;
pub use recorder::{EventRecorder, GestureOptions, RecorderOptions, StatOptions};
pub use scene::{FocusQuery, FocusedObject, NoFocus, Scene};
pub use slot::{RecorderSlot, SlotError};

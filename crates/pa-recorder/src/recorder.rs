//! The event recorder: semantic interaction events in, telemetry out.
//!
//! # Thread Safety
//!
//! [`EventRecorder`] is `Send + Sync`. The gaze stopwatch, the hold
//! stopwatch and the currently viewed subject share one mutex, so a
//! gaze-on/gaze-off pair always sees consistent timer state. The lock is
//! released before the transport is called.
//!
//! # Failure Handling
//!
//! No operation panics or returns `Err`. Every problem is reported to the
//! [`DiagnosticsSink`] and the operation returns the resulting [`Status`],
//! which callers are free to ignore.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pa_core::grouping::{DEFAULT_MAPPING_GROUP, DEFAULT_MAPPING_LAYER};
use pa_core::{
    Clock, ErrorCode, Event, EventKind, Formula, GestureType, Measurement, MonotonicClock, Status,
    Stopwatch, SubjectId, Value,
};
use pa_transport::Transport;
use parking_lot::Mutex;

use crate::diagnostics::{Diagnostic, DiagnosticsSink, ForwardFailures, TracingSink};
use crate::scene::{FocusQuery, NoFocus, Scene};

/// Recorder behavior switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Log every recorded event at `info`.
    pub log_summary: bool,
    /// Layer enrolled by [`EventRecorder::include_mapping`].
    pub mapping_layer: u32,
    /// Group identifier used by [`EventRecorder::include_mapping`].
    pub mapping_group: String,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            log_summary: false,
            mapping_layer: DEFAULT_MAPPING_LAYER,
            mapping_group: DEFAULT_MAPPING_GROUP.to_string(),
        }
    }
}

/// Optional parts of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureOptions<'a> {
    /// Hold duration in seconds; zero for taps.
    pub hold_length: f64,
    pub gesture: GestureType,
    /// Subject used when nothing is focused.
    pub fallback_subject: &'a str,
}

/// Optional parts of a custom stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatOptions<'a> {
    pub measurement: Measurement,
    pub formula: Formula,
    /// Subject used when nothing is focused.
    pub fallback_subject: &'a str,
}

#[derive(Debug, Default)]
struct InteractionState {
    gaze: Stopwatch,
    hold: Stopwatch,
    viewed: Option<SubjectId>,
}

/// Turns interaction signals into telemetry events.
pub struct EventRecorder {
    transport: Arc<dyn Transport>,
    focus: Arc<dyn FocusQuery>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    clock: Arc<dyn Clock>,
    options: RecorderOptions,
    configured: AtomicBool,
    state: Mutex<InteractionState>,
}

impl fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecorder")
            .field("options", &self.options)
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}

impl EventRecorder {
    /// Creates a recorder sending through `transport`, with no focus source,
    /// `tracing` diagnostics and the monotonic clock.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            focus: Arc::new(NoFocus),
            diagnostics: Arc::new(TracingSink),
            clock: Arc::new(MonotonicClock::new()),
            options: RecorderOptions::default(),
            configured: AtomicBool::new(false),
            state: Mutex::new(InteractionState::default()),
        }
    }

    #[must_use]
    pub fn with_focus(mut self, focus: Arc<dyn FocusQuery>) -> Self {
        self.focus = focus;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RecorderOptions) -> Self {
        self.options = options;
        self
    }

    pub const fn options(&self) -> &RecorderOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticsSink> {
        &self.diagnostics
    }

    /// Initializes the transport with the application's API key.
    ///
    /// Spaces are stripped from the key first. Until this succeeds every
    /// record call is a no-op returning [`ErrorCode::NotConfigured`].
    /// Failures the transport finds later, after a record call returned,
    /// are reported to this recorder's diagnostics sink.
    pub fn configure(&self, api_key: &str) -> Status {
        let api_key = api_key.replace(' ', "");
        self.transport
            .set_failure_listener(Arc::new(ForwardFailures(Arc::clone(&self.diagnostics))));
        let status = self.transport.configure(&api_key);
        match status {
            Status::Success => {
                self.configured.store(true, Ordering::Release);
                tracing::debug!("analytics configured");
            }
            Status::Failed(_) => {
                self.diagnostics.report(Diagnostic::Configuration {
                    code: status.code(),
                    message: self.transport.error_message(status.code()),
                });
            }
        }
        status
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    /// Starts timing a gaze on `subject`.
    pub fn gaze_on(&self, subject: &str) {
        let subject = subject_or_sentinel(subject);
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.viewed = Some(subject);
        state.gaze.start(now);
    }

    /// Ends the current gaze and records how long it lasted.
    ///
    /// Without a preceding [`gaze_on`](Self::gaze_on) nothing is recorded.
    pub fn gaze_off(&self) -> Status {
        let now = self.clock.now();
        let (viewed, seconds) = {
            let mut state = self.state.lock();
            state.gaze.stop(now);
            let seconds = state.gaze.elapsed_secs(now);
            state.gaze.reset();
            (state.viewed.take(), seconds)
        };

        let Some(subject) = viewed else {
            tracing::debug!("gaze off without an active gaze");
            return Status::Success;
        };
        match self.value(EventKind::Gaze, seconds) {
            Ok(seconds) => self.send(Event::gaze(subject, seconds, Utc::now())),
            Err(status) => status,
        }
    }

    /// Records a spoken keyword, attributed to the focused object if any.
    pub fn keyword(&self, keyword: &str, fallback_subject: &str) -> Status {
        let subject = self.attributed_subject(fallback_subject);
        self.send(Event::keyword(keyword, subject, Utc::now()))
    }

    /// Records a tap on `identifier`.
    pub fn gesture(&self, identifier: &str) -> Status {
        self.gesture_with(identifier, GestureOptions::default())
    }

    /// Records a gesture.
    ///
    /// When the focused object belongs to a group, both the identifier and
    /// the subject become the group identifier. Otherwise the focused
    /// object's name is the subject, then the fallback, then `identifier`.
    pub fn gesture_with(&self, identifier: &str, options: GestureOptions<'_>) -> Status {
        let kind = match options.gesture {
            GestureType::Hold => EventKind::Hold,
            GestureType::Tap | GestureType::DoubleTap => EventKind::Gesture,
        };
        let hold_length = match Value::new(options.hold_length) {
            Ok(value) => value,
            Err(err) => {
                self.diagnostics.report(Diagnostic::InvalidInput {
                    kind,
                    reason: err.to_string(),
                });
                return Status::Failed(ErrorCode::InvalidHoldLength);
            }
        };

        let (identifier, subject) = match self.focus.focused() {
            Some(focused) => match focused.group() {
                Some(group) => (group.to_string(), group.to_string()),
                None => (identifier.to_string(), focused.name.clone()),
            },
            None => {
                let subject = non_empty(options.fallback_subject).unwrap_or(identifier);
                (identifier.to_string(), subject.to_string())
            }
        };

        self.send(Event::gesture(
            identifier,
            subject_or_sentinel(&subject),
            options.gesture,
            hold_length,
            Utc::now(),
        ))
    }

    /// Starts timing a hold gesture.
    pub fn hold_started(&self) {
        let now = self.clock.now();
        self.state.lock().hold.start(now);
    }

    /// Ends the current hold and records it as a hold gesture on
    /// `identifier`. The duration comes from the hold stopwatch, which is
    /// reset afterwards.
    pub fn hold_complete(&self, identifier: &str) -> Status {
        let now = self.clock.now();
        let seconds = {
            let mut state = self.state.lock();
            state.hold.stop(now);
            let seconds = state.hold.elapsed_secs(now);
            state.hold.reset();
            seconds
        };
        self.gesture_with(
            identifier,
            GestureOptions {
                hold_length: seconds,
                gesture: GestureType::Hold,
                fallback_subject: "",
            },
        )
    }

    /// Records a stat counted toward a running total.
    pub fn custom_stat(&self, identifier: &str, value: f64) -> Status {
        self.custom_stat_with(identifier, value, StatOptions::default())
    }

    /// Records a stat with explicit measurement and formula.
    pub fn custom_stat_with(
        &self,
        identifier: &str,
        value: f64,
        options: StatOptions<'_>,
    ) -> Status {
        let value = match self.value(EventKind::CustomStat, value) {
            Ok(value) => value,
            Err(status) => return status,
        };
        let subject = self.attributed_subject(options.fallback_subject);
        self.send(Event::custom_stat(
            identifier,
            value,
            options.measurement,
            options.formula,
            subject,
            Utc::now(),
        ))
    }

    /// Records a resource gain.
    pub fn gain(&self, identifier: &str, value: f64) -> Status {
        match self.value(EventKind::Gain, value) {
            Ok(value) => self.send(Event::gain(identifier, value, Utc::now())),
            Err(status) => status,
        }
    }

    /// Records a resource loss.
    pub fn loss(&self, identifier: &str, value: f64) -> Status {
        match self.value(EventKind::Loss, value) {
            Ok(value) => self.send(Event::loss(identifier, value, Utc::now())),
            Err(status) => status,
        }
    }

    /// Groups the spatial-mapping layer of `scene` under the mapping group.
    ///
    /// Call once the mapping phase has finished; meshes created later are
    /// not grouped unless this is called again.
    pub fn include_mapping(&self, scene: &Scene) -> usize {
        scene.enroll_by_layer(self.options.mapping_layer, &self.options.mapping_group)
    }

    /// Message for a status code.
    pub fn error_message(&self, code: i32) -> String {
        self.transport.error_message(code)
    }

    /// Message of the transport's most recent failure.
    pub fn last_error_message(&self) -> Option<String> {
        self.transport.last_error_message()
    }

    /// Waits up to `timeout` for queued events to reach the backend.
    pub fn flush(&self, timeout: Duration) -> Status {
        self.transport.flush(timeout)
    }

    /// The focused object's grouped identifier, else the fallback.
    fn attributed_subject(&self, fallback: &str) -> Option<SubjectId> {
        let focused = self
            .focus
            .focused()
            .map(|focused| focused.effective_id().to_string());
        focused
            .or_else(|| non_empty(fallback).map(str::to_string))
            .and_then(|subject| SubjectId::new(subject).ok())
    }

    fn value(&self, kind: EventKind, value: f64) -> Result<Value, Status> {
        Value::new(value).map_err(|err| {
            self.diagnostics.report(Diagnostic::InvalidInput {
                kind,
                reason: err.to_string(),
            });
            Status::Failed(ErrorCode::InvalidValue)
        })
    }

    fn send(&self, event: Event) -> Status {
        if self.options.log_summary {
            tracing::info!(
                kind = %event.kind,
                identifier = %event.identifier,
                subject = event.subject_str(),
                value = event.value.get(),
                measurement = %event.measurement,
                formula = %event.formula,
                "event recorded"
            );
        }

        if !self.is_configured() {
            let status = Status::Failed(ErrorCode::NotConfigured);
            self.diagnostics.report(Diagnostic::NotConfigured {
                kind: event.kind,
                message: self.transport.error_message(status.code()),
            });
            return status;
        }

        let status = self.transport.record(&event);
        if !status.is_success() {
            self.diagnostics.report(Diagnostic::Transport {
                kind: event.kind,
                code: status.code(),
                message: self.transport.error_message(status.code()),
            });
        }
        status
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn subject_or_sentinel(subject: &str) -> SubjectId {
    SubjectId::new(subject).unwrap_or_else(|_| {
        tracing::debug!("empty subject, recording as unattributed");
        SubjectId::unattributed()
    })
}

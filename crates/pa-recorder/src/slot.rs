//! A process-wide home for at most one active recorder.
//!
//! Host applications that want a single shared recorder install it here;
//! everything else can keep passing an `Arc<EventRecorder>` around.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticsSink, TracingSink};
use crate::recorder::EventRecorder;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    #[error("a recorder is already installed")]
    AlreadyActive,
}

/// Holds the active recorder, if any.
pub struct RecorderSlot {
    active: Mutex<Option<Arc<EventRecorder>>>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl std::fmt::Debug for RecorderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderSlot")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl Default for RecorderSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSlot {
    pub fn new() -> Self {
        Self::with_diagnostics(Arc::new(TracingSink))
    }

    pub fn with_diagnostics(diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            active: Mutex::new(None),
            diagnostics,
        }
    }

    /// The slot shared by the whole process.
    pub fn global() -> &'static Self {
        static GLOBAL: Lazy<RecorderSlot> = Lazy::new(RecorderSlot::new);
        &GLOBAL
    }

    /// Makes `recorder` the active one.
    ///
    /// Fails and reports a diagnostic if another recorder is active; the
    /// existing one stays in place.
    pub fn install(&self, recorder: Arc<EventRecorder>) -> Result<Arc<EventRecorder>, SlotError> {
        let mut active = self.active.lock();
        if active.is_some() {
            drop(active);
            self.diagnostics.report(Diagnostic::DuplicateInstance);
            return Err(SlotError::AlreadyActive);
        }
        *active = Some(Arc::clone(&recorder));
        tracing::debug!("recorder installed");
        Ok(recorder)
    }

    /// The active recorder, if one is installed.
    pub fn current(&self) -> Option<Arc<EventRecorder>> {
        self.active.lock().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Uninstalls `recorder` if it is the active one. Returns whether it was.
    pub fn teardown(&self, recorder: &Arc<EventRecorder>) -> bool {
        let mut active = self.active.lock();
        match active.as_ref() {
            Some(current) if Arc::ptr_eq(current, recorder) => {
                *active = None;
                tracing::debug!("recorder torn down");
                true
            }
            _ => false,
        }
    }
}

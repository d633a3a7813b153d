//! Where recording problems are reported.
//!
//! Telemetry failures never reach the caller's control flow. They are turned
//! into a [`Diagnostic`] and handed to a [`DiagnosticsSink`].

use std::sync::Arc;

use pa_core::{EventKind, Status};
use pa_transport::FailureListener;
use parking_lot::Mutex;
use thiserror::Error;

/// A reportable problem. `Display` is the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// Configuring the transport failed.
    #[error("{message}")]
    Configuration { code: i32, message: String },

    /// An event was recorded before a successful `configure`.
    #[error("{kind} event dropped: {message}")]
    NotConfigured { kind: EventKind, message: String },

    /// The transport returned a nonzero status for an event.
    #[error("{message}")]
    Transport {
        kind: EventKind,
        code: i32,
        message: String,
    },

    /// An event was rejected before reaching the transport.
    #[error("{kind} event dropped: {reason}")]
    InvalidInput { kind: EventKind, reason: String },

    /// A second recorder was installed while one was active.
    #[error("trying to install a second recorder while one is active")]
    DuplicateInstance,
}

/// Receives diagnostics. Implementations must not panic.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Logs diagnostics through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::Configuration { code, message } => {
                tracing::warn!(code, %message, "analytics configuration failed");
            }
            Diagnostic::NotConfigured { kind, .. } => {
                tracing::debug!(%kind, "analytics not configured, event dropped");
            }
            Diagnostic::Transport {
                kind,
                code,
                message,
            } => {
                tracing::warn!(%kind, code, %message, "analytics event failed");
            }
            Diagnostic::InvalidInput { kind, reason } => {
                tracing::warn!(%kind, %reason, "analytics event rejected");
            }
            Diagnostic::DuplicateInstance => {
                tracing::error!("{diagnostic}");
            }
        }
    }
}

/// Keeps diagnostics in memory for inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reported: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.reported.lock().clone()
    }

    /// The `Display` text of every diagnostic, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics().iter().map(ToString::to_string).collect()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.reported.lock().push(diagnostic);
    }
}

/// Turns failures found by a transport's worker into
/// [`Diagnostic::Transport`] reports.
pub(crate) struct ForwardFailures(pub(crate) Arc<dyn DiagnosticsSink>);

impl FailureListener for ForwardFailures {
    fn on_failure(&self, kind: EventKind, status: Status) {
        self.0.report(Diagnostic::Transport {
            kind,
            code: status.code(),
            message: status.message(),
        });
    }
}

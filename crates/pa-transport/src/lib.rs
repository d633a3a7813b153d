//! Transports carrying telemetry events to the analytics backend.
//!
//! Provides:
//! - The [`Transport`] trait the recorder sends through
//! - [`HttpTransport`]: the real backend client, queued and non-blocking
//! - [`MemoryTransport`] and [`NoopTransport`]: stubs for tests and dry runs

mod http;
mod memory;
pub mod wire;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use pa_core::status::{self, Status};
use pa_core::{Event, EventKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::{HttpConfig, HttpTransport};
pub use memory::{MemoryTransport, NoopTransport};
pub use wire::WireRecord;

/// Transport construction errors.
///
/// Runtime failures are never errors: they come back as a [`Status`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend endpoint is not a valid URL.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// Failed to start the background runtime.
    #[error("failed to start transport runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The queue capacity must be at least one.
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
}

/// The boundary to the analytics backend.
///
/// Every call returns immediately with a status. Implementations must not
/// block on the network inside [`record`](Transport::record).
pub trait Transport: Send + Sync {
    /// One-time initialization with the application's API key.
    fn configure(&self, api_key: &str) -> Status;

    /// Sends one event, fire-and-forget.
    fn record(&self, event: &Event) -> Status;

    /// Message for a status code.
    fn error_message(&self, code: i32) -> String {
        status::message_for(code)
    }

    /// Message of the most recent failure, if any.
    fn last_error_message(&self) -> Option<String>;

    /// Waits up to `timeout` for queued events to be handed to the backend.
    fn flush(&self, _timeout: Duration) -> Status {
        Status::Success
    }

    /// Registers who hears about events that fail after `record` returned.
    ///
    /// Transports that deliver synchronously report everything through the
    /// returned status and can ignore this.
    fn set_failure_listener(&self, _listener: Arc<dyn FailureListener>) {}
}

/// Receives delivery failures found by a transport's background worker.
pub trait FailureListener: Send + Sync {
    fn on_failure(&self, kind: EventKind, status: Status);
}

/// Which transport implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Http,
    Memory,
    Noop,
}

impl TransportKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Memory => "memory",
            Self::Noop => "noop",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "memory" => Ok(Self::Memory),
            "noop" => Ok(Self::Noop),
            _ => Err(format!("unknown transport: {s}")),
        }
    }
}

/// The most recent failure message, shared between a transport and its
/// background worker. Successes do not clear it.
#[derive(Debug, Default)]
pub struct LastError(Mutex<Option<String>>);

impl LastError {
    pub fn observe(&self, status: Status) {
        if let Status::Failed(err) = status {
            *self.0.lock() = Some(err.to_string());
        }
    }

    pub fn get(&self) -> Option<String> {
        self.0.lock().clone()
    }
}

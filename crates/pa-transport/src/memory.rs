//! In-process transports.

use std::collections::VecDeque;
use pa_core::{ErrorCode, Event, Status};
use parking_lot::{Mutex, MutexGuard};

use crate::{LastError, Transport};

/// Keeps every event it is handed and answers with scripted statuses.
///
/// Used as the test stub and by dry-run replays.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
    last_error: LastError,
}

#[derive(Debug, Default)]
struct MemoryState {
    api_key: Option<String>,
    events: Vec<Event>,
    scripted: VecDeque<Status>,
    fallback: Status,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that already accepted `api_key`.
    pub fn configured(api_key: &str) -> Self {
        let transport = Self::new();
        transport.configure(api_key);
        transport
    }

    /// Answers the next `record` call with `status`. Queued statuses are used
    /// in order before falling back to [`fail_with`](Self::fail_with).
    pub fn push_status(&self, status: Status) {
        self.lock().scripted.push_back(status);
    }

    /// Answers every unscripted `record` call with `status`.
    pub fn fail_with(&self, status: Status) {
        self.lock().fallback = status;
    }

    /// Events received so far, in send order.
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// Drains the received events.
    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut self.lock().events)
    }

    pub fn api_key(&self) -> Option<String> {
        self.lock().api_key.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock()
    }
}

impl Transport for MemoryTransport {
    fn configure(&self, api_key: &str) -> Status {
        if api_key.trim().is_empty() {
            let status = Status::Failed(ErrorCode::InvalidApiKey);
            self.last_error.observe(status);
            return status;
        }
        self.lock().api_key = Some(api_key.to_string());
        Status::Success
    }

    fn record(&self, event: &Event) -> Status {
        let status = {
            let mut state = self.lock();
            if state.api_key.is_none() {
                Status::Failed(ErrorCode::NotConfigured)
            } else {
                state.events.push(event.clone());
                let fallback = state.fallback;
                state.scripted.pop_front().unwrap_or(fallback)
            }
        };
        self.last_error.observe(status);
        status
    }

    fn last_error_message(&self) -> Option<String> {
        self.last_error.get()
    }
}

/// Accepts and drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransport;

impl Transport for NoopTransport {
    fn configure(&self, _api_key: &str) -> Status {
        Status::Success
    }

    fn record(&self, event: &Event) -> Status {
        tracing::trace!(kind = %event.kind, identifier = %event.identifier, "dropping event");
        Status::Success
    }

    fn last_error_message(&self) -> Option<String> {
        None
    }
}

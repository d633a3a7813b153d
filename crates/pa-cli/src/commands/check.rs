//! Verify that the configured backend accepts the API key.

use std::io::Write;

use anyhow::Result;
use pa_core::Status;
use pa_recorder::EventRecorder;

use crate::Config;
use crate::commands::{api_key, build_transport};

/// Configures the selected transport and prints the resulting status.
///
/// Returns the status so the caller can choose the exit code.
pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<Status> {
    let api_key = api_key(config)?;
    let recorder = EventRecorder::new(build_transport(config)?);

    writeln!(writer, "Transport: {}", config.transport)?;
    if config.transport == pa_transport::TransportKind::Http {
        writeln!(writer, "Endpoint: {}", config.endpoint)?;
    }

    let status = recorder.configure(api_key);
    writeln!(writer, "Status: {status}")?;
    Ok(status)
}

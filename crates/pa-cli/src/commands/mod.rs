//! CLI subcommand implementations.

pub mod check;
pub mod errors;
pub mod record;
pub mod replay;

use std::sync::Arc;

use anyhow::{Context, Result};
use pa_recorder::EventRecorder;
use pa_transport::{HttpTransport, MemoryTransport, NoopTransport, Transport, TransportKind};

use crate::Config;

/// Builds the transport selected by `config.transport`.
pub fn build_transport(config: &Config) -> Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match config.transport {
        TransportKind::Http => Arc::new(
            HttpTransport::new(config.http_config()).context("failed to start HTTP transport")?,
        ),
        TransportKind::Memory => Arc::new(MemoryTransport::new()),
        TransportKind::Noop => Arc::new(NoopTransport),
    };
    tracing::debug!(transport = %config.transport, "transport ready");
    Ok(transport)
}

/// The configured API key, or an error explaining how to set one.
pub fn api_key(config: &Config) -> Result<&str> {
    config
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .context("no API key configured (set PA_API_KEY or api_key in config.toml)")
}

/// A recorder over the configured transport, already configured with the
/// API key. Fails if the backend rejects the key.
pub fn configured_recorder(config: &Config) -> Result<EventRecorder> {
    let api_key = api_key(config)?;
    let recorder = EventRecorder::new(build_transport(config)?)
        .with_options(config.recorder_options());
    let status = recorder.configure(api_key);
    if !status.is_success() {
        anyhow::bail!("configuration failed: {status}");
    }
    Ok(recorder)
}

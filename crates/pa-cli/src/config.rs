//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use pa_core::grouping::{DEFAULT_MAPPING_GROUP, DEFAULT_MAPPING_LAYER};
use pa_recorder::RecorderOptions;
use pa_transport::{HttpConfig, TransportKind};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Key the backend issued for this application.
    pub api_key: Option<String>,
    /// Backend base URL.
    pub endpoint: String,
    pub transport: TransportKind,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub queue_capacity: usize,
    /// Log every recorded event at `info`.
    pub log_summary: bool,
    pub mapping_layer: u32,
    pub mapping_group: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("transport", &self.transport)
            .field("timeout_secs", &self.timeout_secs)
            .field("queue_capacity", &self.queue_capacity)
            .field("log_summary", &self.log_summary)
            .field("mapping_layer", &self.mapping_layer)
            .field("mapping_group", &self.mapping_group)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let http = HttpConfig::default();
        Self {
            api_key: None,
            endpoint: http.endpoint,
            transport: TransportKind::default(),
            timeout_secs: http.timeout.as_secs(),
            queue_capacity: http.queue_capacity,
            log_summary: false,
            mapping_layer: DEFAULT_MAPPING_LAYER,
            mapping_group: DEFAULT_MAPPING_GROUP.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations, then `config_path` if
    /// given, then `PA_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // PA_API_KEY, PA_TRANSPORT, ...
        figment = figment.merge(Env::prefixed("PA_"));

        figment.extract()
    }

    /// Settings for [`pa_transport::HttpTransport`].
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            endpoint: self.endpoint.clone(),
            timeout: self.timeout(),
            queue_capacity: self.queue_capacity,
            ..HttpConfig::default()
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn recorder_options(&self) -> RecorderOptions {
        RecorderOptions {
            log_summary: self.log_summary,
            mapping_layer: self.mapping_layer,
            mapping_group: self.mapping_group.clone(),
        }
    }
}

/// Returns the platform-specific config directory for pa.
///
/// On Linux: `~/.config/pa`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pa"))
}

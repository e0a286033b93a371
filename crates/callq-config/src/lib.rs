//! Shared configuration for the callq dispatcher.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path` or `CALLQ_CONFIG_PATH`), then `CALLQ_*`
//! environment variables, then command-line flags. The merged [`Config`] is
//! deliberately permissive; [`Config::broker_settings`] performs the
//! validation transports rely on.

mod action;
mod broker;
mod defaults;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use action::{ActionMode, ActionModeParseError};
pub use broker::{BrokerSettings, ConfigError};
pub use defaults::{
    DEFAULT_HOSTNAME, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_MS,
    default_action, default_hostname, default_log_filter, default_log_filter_string,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for a queue runner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CALLQ")]
pub struct Config {
    /// Broker host name.
    #[ortho_config(default = default_hostname())]
    pub hostname: String,
    /// Broker STOMP port.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Queue the client consumes requests from.
    #[ortho_config(default = String::new())]
    pub request_queue: String,
    /// Queue the client publishes responses to.
    #[ortho_config(default = String::new())]
    pub response_queue: String,
    /// Milliseconds to wait for the next request before the run ends.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
    /// Client action applied to every request of the run.
    #[ortho_config(default = default_action())]
    pub action: ActionMode,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for diagnostic logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: DEFAULT_PORT,
            request_queue: String::new(),
            response_queue: String::new(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            action: default_action(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Broker host name.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Broker port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Bounded wait applied to every receive.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Client action applied to the run.
    #[must_use]
    pub const fn action(&self) -> ActionMode {
        self.action
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Validates the broker-related fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the host or a queue name is blank or the
    /// port is zero.
    pub fn broker_settings(&self) -> Result<BrokerSettings, ConfigError> {
        BrokerSettings::new(
            self.hostname.as_str(),
            self.port,
            self.request_queue.as_str(),
            self.response_queue.as_str(),
            self.request_timeout(),
        )
    }
}

//! Validated broker connection settings.
//!
//! [`Config`](crate::Config) carries raw, possibly incomplete values merged
//! from every configuration layer. Transports only ever see
//! [`BrokerSettings`], which can only be built from values that passed
//! validation.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while validating broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The broker host name was empty.
    #[error("broker hostname must not be empty")]
    EmptyHostname,
    /// Port zero cannot be connected to.
    #[error("broker port must be non-zero")]
    ZeroPort,
    /// A queue name was missing.
    #[error("{role} queue name must not be empty")]
    MissingQueue {
        /// Which queue was missing (`request` or `response`).
        role: &'static str,
    },
}

/// Connection parameters for one consumer/producer pair on a broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    hostname: String,
    port: u16,
    request_queue: String,
    response_queue: String,
    request_timeout: Duration,
}

impl BrokerSettings {
    /// Builds settings after validating every field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the host or a queue name is blank or the
    /// port is zero.
    pub fn new(
        hostname: impl Into<String>,
        port: u16,
        request_queue: impl Into<String>,
        response_queue: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let hostname = hostname.into().trim().to_owned();
        let request_queue = request_queue.into().trim().to_owned();
        let response_queue = response_queue.into().trim().to_owned();

        if hostname.is_empty() {
            return Err(ConfigError::EmptyHostname);
        }
        if port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if request_queue.is_empty() {
            return Err(ConfigError::MissingQueue { role: "request" });
        }
        if response_queue.is_empty() {
            return Err(ConfigError::MissingQueue { role: "response" });
        }

        Ok(Self {
            hostname,
            port,
            request_queue,
            response_queue,
            request_timeout,
        })
    }

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

    /// Queue the client consumes requests from.
    #[must_use]
    pub fn request_queue(&self) -> &str {
        &self.request_queue
    }

    /// Queue the client publishes responses to.
    #[must_use]
    pub fn response_queue(&self) -> &str {
        &self.response_queue
    }

    /// Upper bound on a single wait for the next request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns a copy of the settings with a different receive timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// `host:port` form used in diagnostics.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl fmt::Display for BrokerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} ({} -> {})",
            self.hostname, self.port, self.request_queue, self.response_queue
        )
    }
}

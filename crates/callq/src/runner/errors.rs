//! Error types for runners.

use callq_config::ConfigError;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The broker could not be reached; no request was processed.
    #[error("failed to connect to the broker: {0}")]
    Connect(#[source] TransportError),
    /// The transport failed part way through the run.
    #[error("transport failed while processing messages: {0}")]
    Transport(#[from] TransportError),
    /// The runner was built from invalid settings.
    #[error("invalid runner configuration: {0}")]
    Config(#[from] ConfigError),
    /// The builder was finished without broker settings.
    #[error("no broker settings were provided to the runner builder")]
    MissingSettings,
}

impl RunnerError {
    /// Transport failure behind this error, if any.
    #[must_use]
    pub const fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Connect(error) | Self::Transport(error) => Some(error),
            Self::Config(_) | Self::MissingSettings => None,
        }
    }
}

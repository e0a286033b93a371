//! Error types for broker transports.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::envelope::wire::EnvelopeError;

/// Errors surfaced by [`Transport`](super::Transport) and
/// [`Connector`](super::Connector) implementations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker could not be reached.
    #[error("failed to connect to broker at {endpoint}: {source}")]
    Connect {
        /// `host:port` that was dialled.
        endpoint: String,
        /// Underlying socket error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The broker was reached but refused the session.
    #[error("broker at {endpoint} refused the session: {message}")]
    Refused {
        /// `host:port` that was dialled.
        endpoint: String,
        /// Reason reported by the broker.
        message: String,
    },
    /// Reading from or writing to the broker failed.
    #[error("broker I/O failed during {operation}: {source}")]
    Io {
        /// Step that was in progress.
        operation: &'static str,
        /// Underlying socket error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The broker sent something the client does not understand.
    #[error("broker protocol violation: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },
    /// The broker reported an error for an operation.
    #[error("broker reported an error: {message}")]
    Broker {
        /// Message reported by the broker.
        message: String,
    },
    /// The connection was closed while an operation was in progress.
    #[error("broker connection closed during {operation}")]
    Closed {
        /// Step that was in progress.
        operation: &'static str,
    },
    /// An inbound or outbound envelope was invalid.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl TransportError {
    /// Creates a connection failure.
    pub fn connect(endpoint: impl Into<String>, source: io::Error) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a session refusal.
    pub fn refused(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O failure for `operation`.
    pub fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io {
            operation,
            source: Arc::new(source),
        }
    }

    /// Creates a protocol violation.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a broker-reported error.
    pub fn broker(message: impl Into<String>) -> Self {
        Self::Broker {
            message: message.into(),
        }
    }

    /// Returns `true` for failures raised while establishing the session.
    #[must_use]
    pub const fn is_connect_failure(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Refused { .. })
    }
}

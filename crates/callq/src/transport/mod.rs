//! Port between the runner and a message broker.
//!
//! The runner never talks to a broker directly. It asks a [`Transport`] for
//! the next request with a bounded wait and hands finished responses back for
//! publication and acknowledgment. A [`Connector`] opens the transport so the
//! caller can report connection failures before any request is touched.

mod errors;

use std::time::Duration;

use callq_config::BrokerSettings;

use crate::envelope::{Request, Response};

pub use self::errors::TransportError;

/// Tracing target for transport diagnostics.
pub const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// One consumer/producer pair on a broker.
///
/// Dropping the transport releases every broker resource it holds. Drop
/// implementations tolerate partially opened or already closed resources.
pub trait Transport {
    /// Waits up to `timeout` for the next inbound request.
    ///
    /// Returns `Ok(None)` when nothing arrived in time; absence is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the broker connection fails or the
    /// inbound message cannot be decoded.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Request>, TransportError>;

    /// Publishes `response` and then acknowledges the message `request` was
    /// decoded from.
    ///
    /// The acknowledgment is only sent once the broker accepted the publish,
    /// so a failure in between leads to redelivery rather than loss.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when either step fails; the caller cannot
    /// know whether the request was acknowledged.
    fn respond(&mut self, request: Request, response: &Response) -> Result<(), TransportError>;
}

impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    fn receive(&mut self, timeout: Duration) -> Result<Option<Request>, TransportError> {
        (**self).receive(timeout)
    }

    fn respond(&mut self, request: Request, response: &Response) -> Result<(), TransportError> {
        (**self).respond(request, response)
    }
}

/// Opens transports for a broker.
pub trait Connector {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Connects to the broker and prepares the consumer and producer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the broker is unreachable or refuses
    /// the session.
    fn connect(&self, settings: &BrokerSettings) -> Result<Self::Transport, TransportError>;
}

//! STOMP implementation of the callq transport port.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use callq::envelope::wire::{decode_request, encode_response};
use callq::{Connector, DeliveryHandle, Request, Response, Transport, TransportError};
use callq_config::BrokerSettings;
use tracing::{debug, info, warn};

use crate::BROKER_TARGET;
use crate::connection::Connection;
use crate::frame::{Command, Frame};

/// Bound on TCP connect and on waiting for `CONNECTED`.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on waiting for the broker to confirm a frame with a receipt.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(5);

const SUBSCRIPTION_ID: &str = "callq-0";

/// Queue destination name for `queue`.
#[must_use]
pub fn queue_destination(queue: &str) -> String {
    format!("/queue/{queue}")
}

/// Consumer/producer pair on a STOMP broker.
///
/// Requests are consumed with `client-individual` acknowledgment and a
/// prefetch of one, so at most one unacknowledged request is in flight.
/// Responses are sent non-persistent and confirmed with a receipt before the
/// request is acknowledged. Dropping the broker sends a receipted
/// `DISCONNECT` and waits up to [`RECEIPT_TIMEOUT`] for its receipt, which
/// the broker only sends after every earlier `ACK`, then closes the socket.
/// The broker redelivers anything left unacknowledged.
#[derive(Debug)]
pub struct StompBroker {
    connection: Connection,
    response_destination: String,
    pending: VecDeque<Frame>,
    next_receipt: u64,
}

impl StompBroker {
    /// Connects, opens a session and subscribes to the request queue.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the socket cannot be opened,
    /// [`TransportError::Refused`] when the broker rejects the session and
    /// other variants when the subscription is not confirmed.
    pub fn connect(settings: &BrokerSettings) -> Result<Self, TransportError> {
        let mut connection = Connection::open(settings.hostname(), settings.port(), CONNECT_TIMEOUT)?;
        open_session(&mut connection, settings.hostname())?;

        let mut broker = Self {
            connection,
            response_destination: queue_destination(settings.response_queue()),
            pending: VecDeque::new(),
            next_receipt: 0,
        };
        broker.subscribe(settings.request_queue())?;
        info!(
            target: BROKER_TARGET,
            endpoint = broker.connection.endpoint(),
            request_queue = settings.request_queue(),
            response_queue = settings.response_queue(),
            "subscribed to request queue"
        );
        Ok(broker)
    }

    fn subscribe(&mut self, request_queue: &str) -> Result<(), TransportError> {
        let receipt = self.receipt_id("subscribe");
        let frame = Frame::new(Command::Subscribe)
            .with_header("id", SUBSCRIPTION_ID)
            .with_header("destination", queue_destination(request_queue))
            .with_header("ack", "client-individual")
            .with_header("activemq.prefetchSize", "1")
            .with_header("receipt", receipt.as_str());
        self.connection.send(&frame, "subscribe")?;
        self.await_receipt(&receipt, "subscribe")
    }

    fn receipt_id(&mut self, purpose: &str) -> String {
        self.next_receipt += 1;
        format!("{purpose}-{}", self.next_receipt)
    }

    /// Waits for `RECEIPT` carrying `receipt`, parking deliveries that arrive
    /// first.
    fn await_receipt(&mut self, receipt: &str, operation: &'static str) -> Result<(), TransportError> {
        let deadline = Instant::now() + RECEIPT_TIMEOUT;
        loop {
            let Some(frame) = self.connection.read_frame(deadline, operation)? else {
                return Err(TransportError::protocol(format!(
                    "no receipt '{receipt}' within {RECEIPT_TIMEOUT:?} during {operation}"
                )));
            };
            match frame.command() {
                Command::Receipt if frame.header("receipt-id") == Some(receipt) => return Ok(()),
                Command::Receipt => {
                    debug!(target: BROKER_TARGET, %frame, expected = receipt, "ignoring stale receipt");
                }
                Command::Message => self.pending.push_back(frame),
                Command::Error => return Err(error_from_frame(&frame)),
                _ => return Err(unexpected(&frame, operation)),
            }
        }
    }

    fn request_from(frame: &Frame) -> Result<Request, TransportError> {
        let tag = frame
            .header("ack")
            .or_else(|| frame.header("message-id"))
            .ok_or_else(|| TransportError::protocol("MESSAGE frame carries neither ack nor message-id"))?;
        let handle = DeliveryHandle::new(tag);
        Ok(decode_request(frame.body(), handle)?)
    }

    fn acknowledge(&mut self, handle: &DeliveryHandle) -> Result<(), TransportError> {
        let frame = Frame::new(Command::Ack).with_header("id", handle.as_str());
        self.connection.send(&frame, "acknowledge")
    }
}

impl Transport for StompBroker {
    fn receive(&mut self, timeout: Duration) -> Result<Option<Request>, TransportError> {
        if let Some(frame) = self.pending.pop_front() {
            return Self::request_from(&frame).map(Some);
        }

        let deadline = Instant::now() + timeout;
        loop {
            let Some(frame) = self.connection.read_frame(deadline, "receive")? else {
                return Ok(None);
            };
            match frame.command() {
                Command::Message => return Self::request_from(&frame).map(Some),
                Command::Receipt => {
                    debug!(target: BROKER_TARGET, %frame, "ignoring late receipt");
                }
                Command::Error => return Err(error_from_frame(&frame)),
                _ => return Err(unexpected(&frame, "receive")),
            }
        }
    }

    fn respond(&mut self, request: Request, response: &Response) -> Result<(), TransportError> {
        let body = encode_response(response)?;
        let receipt = self.receipt_id("send");
        let frame = Frame::new(Command::Send)
            .with_header("destination", self.response_destination.as_str())
            .with_header("content-type", "application/json")
            .with_header("persistent", "false")
            .with_header("receipt", receipt.as_str())
            .with_body(body);
        self.connection.send(&frame, "publish")?;
        self.await_receipt(&receipt, "publish")?;
        self.acknowledge(&request.into_handle())
    }
}

impl Drop for StompBroker {
    fn drop(&mut self) {
        let receipt = self.receipt_id("disconnect");
        let frame = Frame::new(Command::Disconnect).with_header("receipt", receipt.as_str());
        let closed = self
            .connection
            .send(&frame, "disconnect")
            .and_then(|()| self.await_receipt(&receipt, "disconnect"));
        if let Err(error) = closed {
            warn!(target: BROKER_TARGET, %error, "broker did not confirm disconnect");
        }
        if !self.pending.is_empty() {
            warn!(
                target: BROKER_TARGET,
                parked = self.pending.len(),
                "closing with undelivered messages; the broker will redeliver them"
            );
        }
        self.connection.shutdown();
    }
}

fn open_session(connection: &mut Connection, host: &str) -> Result<(), TransportError> {
    let frame = Frame::new(Command::Connect)
        .with_header("accept-version", "1.2")
        .with_header("host", host)
        .with_header("heart-beat", "0,0");
    connection.send(&frame, "connect")?;

    let deadline = Instant::now() + CONNECT_TIMEOUT;
    let endpoint = connection.endpoint().to_owned();
    match connection.read_frame(deadline, "connect")? {
        Some(reply) if reply.command() == Command::Connected => {
            debug!(
                target: BROKER_TARGET,
                version = reply.header("version").unwrap_or("unknown"),
                server = reply.header("server").unwrap_or("unknown"),
                "session opened"
            );
            Ok(())
        }
        Some(reply) if reply.command() == Command::Error => {
            Err(TransportError::refused(endpoint, error_message(&reply)))
        }
        Some(reply) => Err(unexpected(&reply, "connect")),
        None => Err(TransportError::refused(
            endpoint,
            format!("no CONNECTED frame within {CONNECT_TIMEOUT:?}"),
        )),
    }
}

fn error_message(frame: &Frame) -> String {
    let summary = frame.header("message").unwrap_or("broker error");
    let body = frame.body_text();
    let detail = body.trim();
    if detail.is_empty() {
        summary.to_owned()
    } else {
        format!("{summary}: {detail}")
    }
}

fn error_from_frame(frame: &Frame) -> TransportError {
    TransportError::broker(error_message(frame))
}

fn unexpected(frame: &Frame, operation: &str) -> TransportError {
    TransportError::protocol(format!("unexpected {frame} during {operation}"))
}

/// [`Connector`] opening [`StompBroker`] transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct StompConnector;

impl StompConnector {
    /// Creates a connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for StompConnector {
    type Transport = StompBroker;

    fn connect(&self, settings: &BrokerSettings) -> Result<Self::Transport, TransportError> {
        StompBroker::connect(settings)
    }
}

//! In-process broker for exercising runners without a network.
//!
//! [`MemoryBroker`] keeps named FIFO queues and tracks every delivered but
//! unacknowledged message, mirroring the queue statistics a real broker
//! exposes: [`MemoryBroker::queue_size`] counts pending and in-flight
//! messages, so a request only disappears once it has been acknowledged.
//! Dropping a [`MemoryTransport`] returns its unacknowledged deliveries to the
//! front of their queue.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use callq_config::BrokerSettings;
use tracing::debug;

use crate::envelope::wire::{decode_request, encode_response};
use crate::envelope::{DeliveryHandle, Request, Response};
use crate::transport::{Connector, TRANSPORT_TARGET, Transport, TransportError};

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: String,
}

#[derive(Debug)]
struct InFlight {
    queue: String,
    message: StoredMessage,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<String, VecDeque<StoredMessage>>,
    in_flight: HashMap<String, InFlight>,
    unavailable: bool,
    publish_failure: Option<String>,
    next_message_id: u64,
}

impl BrokerState {
    fn queue_mut(&mut self, name: &str) -> &mut VecDeque<StoredMessage> {
        self.queues.entry(name.to_owned()).or_default()
    }

    fn enqueue(&mut self, queue: &str, body: String) -> String {
        self.next_message_id += 1;
        let message_id = format!("ID:memory-{}", self.next_message_id);
        self.queue_mut(queue).push_back(StoredMessage {
            message_id: message_id.clone(),
            body,
        });
        message_id
    }

    fn in_flight_count(&self, queue: &str) -> usize {
        self.in_flight
            .values()
            .filter(|delivery| delivery.queue == queue)
            .count()
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<BrokerState>,
    arrivals: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle on an in-process broker.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    /// Creates a broker with no queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `name` if it does not exist yet.
    pub fn add_queue(&self, name: &str) {
        self.shared.lock().queue_mut(name);
    }

    /// Removes every pending and in-flight message from `name`.
    pub fn purge(&self, name: &str) {
        let mut state = self.shared.lock();
        state.queue_mut(name).clear();
        state.in_flight.retain(|_, delivery| delivery.queue != name);
    }

    /// Appends a text message to `queue`, returning its broker message id.
    pub fn send_text(&self, queue: &str, body: impl Into<String>) -> String {
        let message_id = self.shared.lock().enqueue(queue, body.into());
        self.shared.arrivals.notify_all();
        message_id
    }

    /// Pending plus delivered-but-unacknowledged messages on `queue`.
    #[must_use]
    pub fn queue_size(&self, queue: &str) -> usize {
        let state = self.shared.lock();
        let pending = state.queues.get(queue).map_or(0, VecDeque::len);
        pending + state.in_flight_count(queue)
    }

    /// Bodies of the pending messages on `queue`, oldest first.
    #[must_use]
    pub fn message_contents(&self, queue: &str) -> Vec<String> {
        self.shared.lock().queues.get(queue).map_or_else(Vec::new, |messages| {
            messages.iter().map(|message| message.body.clone()).collect()
        })
    }

    /// Makes subsequent connection attempts fail as if the broker were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.lock().unavailable = unavailable;
    }

    /// Makes the next publish fail with a broker error carrying `message`.
    pub fn fail_next_publish(&self, message: impl Into<String>) {
        self.shared.lock().publish_failure = Some(message.into());
    }

    /// Connector opening transports on this broker.
    #[must_use]
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            broker: self.clone(),
        }
    }
}

/// [`Connector`] for a [`MemoryBroker`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    broker: MemoryBroker,
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    fn connect(&self, settings: &BrokerSettings) -> Result<Self::Transport, TransportError> {
        let mut state = self.broker.shared.lock();
        if state.unavailable {
            return Err(TransportError::connect(
                settings.endpoint(),
                io::Error::new(io::ErrorKind::ConnectionRefused, "broker is not available"),
            ));
        }
        state.queue_mut(settings.request_queue());
        state.queue_mut(settings.response_queue());
        drop(state);

        debug!(
            target: TRANSPORT_TARGET,
            endpoint = %settings.endpoint(),
            request_queue = settings.request_queue(),
            "memory transport connected"
        );
        Ok(MemoryTransport {
            broker: self.broker.clone(),
            request_queue: settings.request_queue().to_owned(),
            response_queue: settings.response_queue().to_owned(),
            unacknowledged: Vec::new(),
        })
    }
}

/// Consumer/producer pair on a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemoryTransport {
    broker: MemoryBroker,
    request_queue: String,
    response_queue: String,
    unacknowledged: Vec<String>,
}

impl MemoryTransport {
    fn next_delivery(&mut self, timeout: Duration) -> Option<StoredMessage> {
        let shared = &self.broker.shared;
        let deadline = Instant::now() + timeout;
        let mut state = shared.lock();
        loop {
            if let Some(message) = state.queue_mut(&self.request_queue).pop_front() {
                state.in_flight.insert(
                    message.message_id.clone(),
                    InFlight {
                        queue: self.request_queue.clone(),
                        message: message.clone(),
                    },
                );
                self.unacknowledged.push(message.message_id.clone());
                return Some(message);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            state = shared
                .arrivals
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn acknowledge(&mut self, handle: &DeliveryHandle) -> Result<(), TransportError> {
        let tag = handle.as_str();
        if self.broker.shared.lock().in_flight.remove(tag).is_none() {
            return Err(TransportError::protocol(format!(
                "no unacknowledged delivery '{tag}'"
            )));
        }
        self.unacknowledged.retain(|pending| pending != tag);
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn receive(&mut self, timeout: Duration) -> Result<Option<Request>, TransportError> {
        let Some(message) = self.next_delivery(timeout) else {
            return Ok(None);
        };
        let handle = DeliveryHandle::new(message.message_id);
        Ok(Some(decode_request(message.body.as_bytes(), handle)?))
    }

    fn respond(&mut self, request: Request, response: &Response) -> Result<(), TransportError> {
        let body = encode_response(response)?;
        {
            let mut state = self.broker.shared.lock();
            if let Some(message) = state.publish_failure.take() {
                return Err(TransportError::broker(message));
            }
            state.enqueue(&self.response_queue, body);
        }
        self.broker.shared.arrivals.notify_all();
        self.acknowledge(&request.into_handle())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        if self.unacknowledged.is_empty() {
            return;
        }
        let mut state = self.broker.shared.lock();
        for tag in self.unacknowledged.drain(..).rev() {
            if let Some(delivery) = state.in_flight.remove(&tag) {
                state.queue_mut(&delivery.queue).push_front(delivery.message);
            }
        }
        drop(state);
        self.broker.shared.arrivals.notify_all();
    }
}

#[cfg(test)]
mod tests;

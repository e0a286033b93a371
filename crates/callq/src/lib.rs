//! Queue-driven remote-call dispatcher.
//!
//! A client polls a request queue on a message broker, resolves every
//! incoming call against a table of handlers registered at runtime, runs the
//! matching handler and publishes the response to a reply queue. The broker
//! is reached through the [`Transport`] port; `callq-stomp` provides the
//! network implementation and the `memory` module (feature `test-support`)
//! an in-process one for tests.
//!
//! Acknowledgment safety is the central rule: a request is acknowledged only
//! after its response has been accepted by the broker, and a request that is
//! never acknowledged is redelivered once the transport is released.
//!
//! ```
//! use callq::{Connector, QueueRunner, RunSummary, RunnerError, param};
//! use callq_config::Config;
//! use serde_json::json;
//!
//! fn serve<C: Connector>(connector: C, config: &Config) -> Result<RunSummary, RunnerError> {
//!     QueueRunner::builder(connector)
//!         .with_config(config)?
//!         .on("add", |params| {
//!             let left = param(params, 0)?.as_integer()?;
//!             let right = param(params, 1)?.as_integer()?;
//!             Ok(json!(left + right))
//!         })
//!         .build()?
//!         .run()
//! }
//! ```

mod action;
mod audit;
pub mod envelope;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
mod rules;
mod runner;
pub mod telemetry;
pub mod transport;

pub use action::{ClientAction, NOT_PUBLISHED};
pub use audit::{AUDIT_TARGET, AuditSink, BufferedAuditSink, TracingAuditSink, WriterAuditSink};
pub use envelope::{DeliveryHandle, ParamAccessor, ParamError, Request, Response, param};
#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryBroker, MemoryConnector, MemoryTransport};
pub use rules::{Handler, HandlerError, HandlerResult, ProcessingRules, ProcessingRulesBuilder};
pub use runner::{
    PROBLEM_PREFIX, QueueRunner, QueueRunnerBuilder, RUNNER_TARGET, RunSummary, Runner,
    RunnerError,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{Connector, TRANSPORT_TARGET, Transport, TransportError};

#[cfg(test)]
mod tests;

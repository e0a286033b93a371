//! STOMP 1.2 transport for callq.
//!
//! [`StompConnector`] opens a [`StompBroker`], which implements
//! [`callq::Transport`] over a plain TCP connection to an ActiveMQ-compatible
//! broker. Requests are read from `/queue/<request_queue>` and responses are
//! sent to `/queue/<response_queue>`.
//!
//! ```no_run
//! use callq::QueueRunner;
//! use callq_config::Config;
//! use callq_stomp::StompConnector;
//! # use ortho_config::OrthoConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let runner = QueueRunner::builder(StompConnector::new())
//!     .with_config(&config)?
//!     .build()?;
//! runner.run()?;
//! # Ok(())
//! # }
//! ```

mod broker;
mod connection;
pub mod frame;

pub use broker::{CONNECT_TIMEOUT, RECEIPT_TIMEOUT, StompBroker, StompConnector, queue_destination};
pub use frame::{Command, Frame, FrameError};

/// Tracing target for STOMP transport diagnostics.
pub const BROKER_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::broker");

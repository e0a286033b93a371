//! Diagnostic logging for queue runners.
//!
//! Diagnostics always go to standard error. Standard output stays free for
//! the audit stream written by [`WriterAuditSink::stdout`](crate::WriterAuditSink::stdout).

use std::io::{self, IsTerminal};

use callq_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the global subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format chosen by the call that installed the subscriber.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The `log_filter` expression did not parse.
    #[error("invalid log filter '{expression}': {message}")]
    Filter {
        /// Expression as configured.
        expression: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another global subscriber was already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Installs the global subscriber described by `config`.
///
/// Only the first successful call installs anything; later calls hand back a
/// handle reporting the format already in force.
///
/// ```rust
/// use callq::telemetry;
/// use callq_config::Config;
///
/// # fn main() -> Result<(), callq::telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let again = telemetry::initialise(&config)?;
/// assert_eq!(first, again);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an invalid `log_filter` and
/// [`TelemetryError::Subscriber`] when a foreign subscriber is already global.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| {
            let filter = build_filter(config.log_filter())?;
            Registry::default()
                .with(stderr_layer(config.log_format(), filter))
                .try_init()?;
            Ok(config.log_format())
        })
        .map(|format| TelemetryHandle { format: *format })
}

fn build_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter {
        expression: expression.to_owned(),
        message: error.to_string(),
    })
}

fn stderr_layer(format: LogFormat, filter: EnvFilter) -> Box<dyn Layer<Registry> + Send + Sync> {
    let base = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(true)
        .with_thread_names(false)
        .with_timer(UtcTime::rfc_3339());
    match format {
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => base.compact().with_filter(filter).boxed(),
    }
}

//! Dispatch loop driving one transport.
//!
//! [`Runner`] pulls requests through the configured [`ClientAction`],
//! resolves each against the [`ProcessingRules`], lets the action publish or
//! suppress the response and records one audit line per cycle. The loop ends
//! when the action yields no further request. [`QueueRunner`] wraps it with
//! connection handling.

mod errors;
mod queue;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, warn};

use crate::action::ClientAction;
use crate::audit::{AuditSink, compose_line};
use crate::envelope::{Request, Response};
use crate::rules::ProcessingRules;
use crate::transport::Transport;

pub use self::errors::RunnerError;
pub use self::queue::{PROBLEM_PREFIX, QueueRunner, QueueRunnerBuilder};

/// Tracing target for runner diagnostics.
pub const RUNNER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runner");

/// Counts of completed dispatch cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Requests dispatched, successful or not.
    pub processed: usize,
    /// Requests whose response carried an error.
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, response: &Response) {
        self.processed += 1;
        if response.is_error() {
            self.failed += 1;
        }
    }
}

/// Single-threaded dispatch loop over an exclusively owned transport.
pub struct Runner<'a, T> {
    transport: T,
    rules: &'a ProcessingRules,
    action: ClientAction,
    request_timeout: Duration,
    audit: &'a dyn AuditSink,
}

impl<'a, T> Runner<'a, T>
where
    T: Transport,
{
    /// Assembles a runner.
    pub const fn new(
        transport: T,
        rules: &'a ProcessingRules,
        action: ClientAction,
        request_timeout: Duration,
        audit: &'a dyn AuditSink,
    ) -> Self {
        Self {
            transport,
            rules,
            action,
            request_timeout,
            audit,
        }
    }

    /// Processes requests until the action yields none.
    ///
    /// Unknown methods and failing handlers produce error responses and the
    /// loop carries on.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Transport`] when receiving, publishing or
    /// acknowledging fails. Requests completed before the failure have been
    /// published and audited.
    pub fn run(&mut self) -> Result<RunSummary, RunnerError> {
        let mut summary = RunSummary::default();
        while let Some(request) = self
            .action
            .next_request(&mut self.transport, self.request_timeout)?
        {
            let response = self.dispatch(&request);
            let line = compose_line([
                request.audit_text().as_str(),
                response.audit_text().as_str(),
                self.action.audit_text(),
            ]);
            self.action
                .after_response(&mut self.transport, request, &response)?;
            self.audit.log_line(&line);
            summary.record(&response);
        }
        debug!(
            target: RUNNER_TARGET,
            processed = summary.processed,
            failed = summary.failed,
            "no further requests"
        );
        Ok(summary)
    }

    /// Releases the runner, returning its transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn dispatch(&self, request: &Request) -> Response {
        let method = request.method();
        let Some(handler) = self.rules.resolve(method) else {
            warn!(target: RUNNER_TARGET, id = request.id(), method, "unknown method");
            return Response::failure(
                request.id(),
                format!("method '{method}' did not match any processing rule"),
            );
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler.call(request.params()))) {
            Ok(Ok(result)) => {
                debug!(target: RUNNER_TARGET, id = request.id(), method, "handler succeeded");
                Response::success(request.id(), result)
            }
            Ok(Err(error)) => {
                warn!(target: RUNNER_TARGET, id = request.id(), method, %error, "handler failed");
                Response::failure(request.id(), error.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(target: RUNNER_TARGET, id = request.id(), method, %message, "handler panicked");
                Response::failure(request.id(), message)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("handler panicked: {detail}"),
        None => String::from("handler panicked"),
    }
}

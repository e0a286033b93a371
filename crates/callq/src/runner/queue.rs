//! Queue runner owning broker settings and connection handling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use callq_config::{BrokerSettings, Config};
use tracing::{error, info};

use super::{RUNNER_TARGET, RunSummary, Runner, RunnerError};
use crate::action::ClientAction;
use crate::audit::{AuditSink, WriterAuditSink};
use crate::envelope::ParamAccessor;
use crate::rules::{Handler, HandlerResult, ProcessingRules};
use crate::transport::{Connector, TransportError};

/// Prefix of the audit line recorded when a run ends on a transport failure.
pub const PROBLEM_PREFIX: &str = "There was a problem processing messages.";

/// Connects to a broker and runs the dispatch loop over its request queue.
///
/// Each call to [`QueueRunner::run`] opens a fresh transport and releases it
/// before returning, so unacknowledged requests go back to the broker.
pub struct QueueRunner<C> {
    connector: C,
    settings: BrokerSettings,
    action: ClientAction,
    rules: ProcessingRules,
    audit: Arc<dyn AuditSink>,
}

impl<C> fmt::Debug for QueueRunner<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueRunner")
            .field("settings", &self.settings)
            .field("action", &self.action)
            .field("methods", &self.rules.method_names())
            .finish_non_exhaustive()
    }
}

impl<C> QueueRunner<C>
where
    C: Connector,
{
    /// Starts a builder around `connector`.
    pub fn builder(connector: C) -> QueueRunnerBuilder<C> {
        QueueRunnerBuilder::new(connector)
    }

    /// Bounded wait applied to every receive.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.settings.request_timeout()
    }

    /// Broker settings the runner connects with.
    #[must_use]
    pub const fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Action applied to every request.
    #[must_use]
    pub const fn action(&self) -> ClientAction {
        self.action
    }

    /// Registered processing rules.
    #[must_use]
    pub const fn rules(&self) -> &ProcessingRules {
        &self.rules
    }

    /// Connects, processes requests until none remain and disconnects.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Connect`] when the broker cannot be reached and
    /// [`RunnerError::Transport`] when the transport fails mid-run. Both are
    /// also recorded as a single audit line.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        info!(
            target: RUNNER_TARGET,
            endpoint = %self.settings.endpoint(),
            request_queue = self.settings.request_queue(),
            response_queue = self.settings.response_queue(),
            action = ?self.action,
            methods = ?self.rules.method_names(),
            "starting queue runner"
        );

        let transport = match self.connector.connect(&self.settings) {
            Ok(transport) => transport,
            Err(failure) => {
                self.report_problem(&failure);
                return Err(RunnerError::Connect(failure));
            }
        };

        let mut runner = Runner::new(
            transport,
            &self.rules,
            self.action,
            self.settings.request_timeout(),
            self.audit.as_ref(),
        );
        let outcome = runner.run();
        drop(runner.into_transport());

        match outcome {
            Ok(summary) => {
                info!(
                    target: RUNNER_TARGET,
                    processed = summary.processed,
                    failed = summary.failed,
                    "queue runner finished"
                );
                Ok(summary)
            }
            Err(failure) => {
                if let Some(transport_error) = failure.transport_error() {
                    self.report_problem(transport_error);
                }
                Err(failure)
            }
        }
    }

    fn report_problem(&self, failure: &TransportError) {
        error!(target: RUNNER_TARGET, error = %failure, "queue runner stopped");
        self.audit.log_line(&format!("{PROBLEM_PREFIX} {failure}"));
    }
}

/// Builder for [`QueueRunner`].
pub struct QueueRunnerBuilder<C> {
    connector: C,
    settings: Option<BrokerSettings>,
    action: ClientAction,
    rules: ProcessingRules,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<C> QueueRunnerBuilder<C>
where
    C: Connector,
{
    /// Starts an empty builder.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            settings: None,
            action: ClientAction::default(),
            rules: ProcessingRules::new(),
            audit: None,
        }
    }

    /// Takes broker settings and the action from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] when the broker fields are invalid.
    pub fn with_config(mut self, config: &Config) -> Result<Self, RunnerError> {
        self.settings = Some(config.broker_settings()?);
        self.action = config.action().into();
        Ok(self)
    }

    /// Uses explicit broker settings.
    #[must_use]
    pub fn with_settings(mut self, settings: BrokerSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Selects the action applied to every request.
    #[must_use]
    pub const fn with_action(mut self, action: ClientAction) -> Self {
        self.action = action;
        self
    }

    /// Routes audit lines to `audit` instead of standard output.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Replaces the rule table wholesale.
    #[must_use]
    pub fn with_rules(mut self, rules: ProcessingRules) -> Self {
        self.rules = rules;
        self
    }

    /// Registers `handler` for `method`; `None` is ignored.
    #[must_use]
    pub fn with_handler(mut self, method: impl Into<String>, handler: Option<Handler>) -> Self {
        if let Some(handler) = handler {
            self.rules.register(method, handler);
        }
        self
    }

    /// Registers a closure for `method`.
    #[must_use]
    pub fn on<F>(self, method: impl Into<String>, call: F) -> Self
    where
        F: Fn(&[ParamAccessor]) -> HandlerResult + Send + Sync + 'static,
    {
        self.with_handler(method, Some(Handler::new(call)))
    }

    /// Finishes the runner.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::MissingSettings`] when neither
    /// [`with_config`](Self::with_config) nor
    /// [`with_settings`](Self::with_settings) was called.
    pub fn build(self) -> Result<QueueRunner<C>, RunnerError> {
        let settings = self.settings.ok_or(RunnerError::MissingSettings)?;
        let audit = self
            .audit
            .unwrap_or_else(|| Arc::new(WriterAuditSink::stdout()));
        Ok(QueueRunner {
            connector: self.connector,
            settings,
            action: self.action,
            rules: self.rules,
            audit,
        })
    }
}

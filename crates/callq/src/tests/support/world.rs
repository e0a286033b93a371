//! Scenario world driving a [`QueueRunner`] against the in-memory broker.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use callq_config::{ActionMode, Config};
use serde_json::{Value, json};

use crate::audit::BufferedAuditSink;
use crate::envelope::Response;
use crate::envelope::wire::decode_response;
use crate::memory::{MemoryBroker, MemoryConnector};
use crate::rules::{Handler, ProcessingRules};
use crate::runner::{QueueRunner, RunSummary, RunnerError};

use super::rule_for;

/// Scenario world shared across BDD steps.
pub struct QueueWorld {
    pub broker: MemoryBroker,
    pub audit: Arc<BufferedAuditSink>,
    config: Config,
    declared_rules: Vec<(String, Option<Handler>)>,
    runner: Option<QueueRunner<MemoryConnector>>,
    outcome: Option<Result<RunSummary, RunnerError>>,
    sent: usize,
    elapsed: Duration,
}

impl QueueWorld {
    /// Builds a world around an empty broker.
    pub fn new() -> Self {
        Self {
            broker: MemoryBroker::new(),
            audit: Arc::new(BufferedAuditSink::new()),
            config: Config::default(),
            declared_rules: Vec::new(),
            runner: None,
            outcome: None,
            sent: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Creates and empties both queues.
    pub fn clean_broker(&mut self, request_queue: &str, response_queue: &str) {
        for queue in [request_queue, response_queue] {
            self.broker.add_queue(queue);
            self.broker.purge(queue);
        }
        self.config.request_queue = request_queue.to_owned();
        self.config.response_queue = response_queue.to_owned();
        self.audit.clear();
    }

    /// Assembles the declared rules through the registry builder, which
    /// drops declarations without an implementation.
    fn rules(&self) -> ProcessingRules {
        self.declared_rules
            .iter()
            .fold(ProcessingRules::builder(), |builder, (method, handler)| {
                builder.with_handler(method.as_str(), handler.clone())
            })
            .build()
    }

    /// Builds a runner with the current configuration and rules.
    pub fn connect_client(&mut self) {
        let runner = QueueRunner::builder(self.broker.connector())
            .with_config(&self.config)
            .expect("scenario configuration is valid")
            .with_audit(self.audit.clone())
            .with_rules(self.rules())
            .build()
            .expect("runner builds");
        self.runner = Some(runner);
    }

    /// Points the client at a broker that refuses connections.
    pub fn broker_unavailable(&mut self) {
        self.audit.clear();
        self.broker.set_unavailable(true);
        self.config.hostname = String::from("111");
        self.config.request_queue = String::from("X");
        self.config.response_queue = String::from("Y");
        self.connect_client();
    }

    /// Switches the client to `action`.
    pub fn use_action(&mut self, action: ActionMode) {
        self.config.action = action;
    }

    /// Queues one request built from its parts.
    pub fn send_request(&mut self, id: Option<&str>, method: &str, params: &str) {
        let params: Value = serde_json::from_str(&format!("[{params}]"))
            .unwrap_or_else(|error| panic!("invalid params '{params}': {error}"));
        let mut body = json!({ "method": method, "params": params });
        if let (Some(id), Some(object)) = (id, body.as_object_mut()) {
            object.insert(String::from("id"), json!(id));
        }
        self.broker.send_text(self.request_queue(), body.to_string());
        self.sent += 1;
    }

    /// Queues a raw message body.
    pub fn send_raw(&mut self, body: &str) {
        self.broker.send_text(self.request_queue(), body);
        self.sent += 1;
    }

    /// Declares `method` with the scenario implementation named `call`,
    /// which may be absent.
    pub fn register_rule(&mut self, method: &str, call: &str) {
        self.declared_rules.push((method.to_owned(), rule_for(call)));
    }

    /// Builds the runner with the registered rules and runs it once.
    pub fn go_live(&mut self) {
        self.connect_client();
        let runner = self.runner.as_ref().expect("runner was built");
        let started = Instant::now();
        let outcome = runner.run();
        self.elapsed = started.elapsed();
        self.outcome = Some(outcome);
    }

    /// Runs the runner built by [`connect_client`](Self::connect_client).
    pub fn run_existing(&mut self) {
        let runner = self.runner.as_ref().expect("client was connected");
        self.outcome = Some(runner.run());
    }

    /// Request queue under test.
    pub fn request_queue(&self) -> &str {
        &self.config.request_queue
    }

    /// Response queue under test.
    pub fn response_queue(&self) -> &str {
        &self.config.response_queue
    }

    /// Number of requests queued by the scenario.
    pub const fn sent(&self) -> usize {
        self.sent
    }

    /// Wall-clock duration of the last run.
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Runner built for the scenario.
    pub fn runner(&self) -> &QueueRunner<MemoryConnector> {
        self.runner.as_ref().expect("client was connected")
    }

    /// Outcome of the last run.
    pub fn outcome(&self) -> &Result<RunSummary, RunnerError> {
        self.outcome.as_ref().expect("runner was started")
    }

    /// Published responses in publication order.
    pub fn responses(&self) -> Vec<Response> {
        self.broker
            .message_contents(self.response_queue())
            .iter()
            .map(|body| decode_response(body).expect("published response is valid JSON"))
            .collect()
    }

    /// Published response correlated to `id`.
    pub fn response(&self, id: &str) -> Response {
        self.responses()
            .into_iter()
            .find(|response| response.id() == id)
            .unwrap_or_else(|| panic!("no response published for '{id}'"))
    }
}

impl Default for QueueWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default scenario world fixture.
#[must_use]
pub fn world() -> RefCell<QueueWorld> {
    RefCell::new(QueueWorld::new())
}

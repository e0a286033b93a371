//! Request and response envelopes exchanged with the broker.
//!
//! A [`Request`] is created by a transport from one inbound message and owns
//! the [`DeliveryHandle`] needed to acknowledge that message. A [`Response`]
//! is built by the runner once the handler has finished and is correlated to
//! its request by id. The JSON wire form of both lives in [`wire`].

mod params;
pub mod wire;

use std::fmt;

use serde_json::Value;

pub use self::params::{ParamAccessor, ParamError, param};
use self::params::render_params;

static NULL_RESULT: Value = Value::Null;

/// Opaque token identifying one inbound delivery.
///
/// The handle is owned by exactly one [`Request`] and is not `Clone`, so a
/// delivery can be acknowledged at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct DeliveryHandle(String);

impl DeliveryHandle {
    /// Wraps a transport-specific delivery tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Transport-specific delivery tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One inbound call.
#[derive(Debug)]
pub struct Request {
    id: String,
    method: String,
    params: Vec<ParamAccessor>,
    handle: DeliveryHandle,
}

impl Request {
    /// Assembles a request from its decoded parts.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        method: impl Into<String>,
        params: Vec<ParamAccessor>,
        handle: DeliveryHandle,
    ) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
            handle,
        }
    }

    /// Correlation id copied into the response.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the rule to dispatch to.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Positional parameters.
    #[must_use]
    pub fn params(&self) -> &[ParamAccessor] {
        &self.params
    }

    /// Handle of the message this request was decoded from.
    #[must_use]
    pub const fn handle(&self) -> &DeliveryHandle {
        &self.handle
    }

    /// Consumes the request, releasing its delivery handle for acknowledgment.
    #[must_use]
    pub fn into_handle(self) -> DeliveryHandle {
        self.handle
    }

    /// Audit fragment, for example `id = X1, req = add(2, 3)`.
    #[must_use]
    pub fn audit_text(&self) -> String {
        format!(
            "id = {}, req = {}({})",
            self.id,
            self.method,
            render_params(&self.params)
        )
    }
}

/// Outcome of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    id: String,
    outcome: Result<Value, String>,
}

impl Response {
    /// Builds a successful response.
    #[must_use]
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            outcome: Ok(result),
        }
    }

    /// Builds a failed response carrying a diagnostic message.
    #[must_use]
    pub fn failure(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outcome: Err(message.into()),
        }
    }

    /// Correlation id of the originating request.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Handler result; `Value::Null` for failures.
    #[must_use]
    pub fn result(&self) -> &Value {
        match &self.outcome {
            Ok(value) => value,
            Err(_) => &NULL_RESULT,
        }
    }

    /// Diagnostic message for failures.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }

    /// Returns `true` when the handler did not produce a result.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// Audit fragment, `resp = <result>` or `error = "<message>"`.
    #[must_use]
    pub fn audit_text(&self) -> String {
        match &self.outcome {
            Ok(value) => format!("resp = {value}"),
            Err(message) => format!("error = \"{message}\""),
        }
    }
}

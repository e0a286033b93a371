//! Processing rules mapping method names to handlers.
//!
//! [`ProcessingRules`] is assembled before a run, usually through
//! [`ProcessingRulesBuilder`], and then handed to the runner, which only ever
//! reads it. Method names are matched exactly and case-sensitively; a second
//! registration for the same name replaces the first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::envelope::{ParamAccessor, ParamError};

/// Result produced by a handler.
pub type HandlerResult = Result<Value, HandlerError>;

/// Failure reported by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// A parameter was missing or had the wrong type.
    #[error("invalid parameter: {0}")]
    Parameter(#[from] ParamError),
    /// The handler rejected the call.
    #[error("{message}")]
    Failed {
        /// Diagnostic returned to the caller.
        message: String,
    },
}

impl HandlerError {
    /// Creates a handler failure with a diagnostic message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

type HandlerFn = dyn Fn(&[ParamAccessor]) -> HandlerResult + Send + Sync;

/// User-supplied implementation of one method.
#[derive(Clone)]
pub struct Handler {
    call: Arc<HandlerFn>,
}

impl Handler {
    /// Wraps a closure or function as a handler.
    pub fn new<F>(call: F) -> Self
    where
        F: Fn(&[ParamAccessor]) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(call),
        }
    }

    /// Invokes the handler with the request parameters.
    ///
    /// # Errors
    ///
    /// Propagates the handler's own [`HandlerError`].
    pub fn call(&self, params: &[ParamAccessor]) -> HandlerResult {
        (self.call)(params)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

/// Table of handlers keyed by method name.
#[derive(Debug, Clone, Default)]
pub struct ProcessingRules {
    rules: HashMap<String, Handler>,
}

impl ProcessingRules {
    /// Creates an empty rule table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> ProcessingRulesBuilder {
        ProcessingRulesBuilder::default()
    }

    /// Records a handler for `method`, replacing any earlier one.
    pub fn register(&mut self, method: impl Into<String>, handler: Handler) {
        self.rules.insert(method.into(), handler);
    }

    /// Looks up the handler for `method`.
    #[must_use]
    pub fn resolve(&self, method: &str) -> Option<&Handler> {
        self.rules.get(method)
    }

    /// Returns `true` when a handler is registered for `method`.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.rules.contains_key(method)
    }

    /// Registered method names in lexical order.
    #[must_use]
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` when no methods are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Incremental builder for [`ProcessingRules`].
///
/// # Example
///
/// ```
/// use callq::{ProcessingRules, param};
/// use serde_json::json;
///
/// let rules = ProcessingRules::builder()
///     .on("add", |params| {
///         let left = param(params, 0)?.as_integer()?;
///         let right = param(params, 1)?.as_integer()?;
///         Ok(json!(left + right))
///     })
///     .with_handler("unfinished", None)
///     .build();
///
/// assert!(rules.contains("add"));
/// assert!(!rules.contains("unfinished"));
/// ```
#[derive(Debug, Default)]
pub struct ProcessingRulesBuilder {
    rules: ProcessingRules,
}

impl ProcessingRulesBuilder {
    /// Adds a rule when `handler` is present; `None` leaves the table
    /// untouched so the method stays unresolvable.
    #[must_use]
    pub fn with_handler(mut self, method: impl Into<String>, handler: Option<Handler>) -> Self {
        if let Some(handler) = handler {
            self.rules.register(method, handler);
        }
        self
    }

    /// Adds a rule backed by a closure.
    #[must_use]
    pub fn on<F>(self, method: impl Into<String>, call: F) -> Self
    where
        F: Fn(&[ParamAccessor]) -> HandlerResult + Send + Sync + 'static,
    {
        self.with_handler(method, Some(Handler::new(call)))
    }

    /// Finishes the table.
    #[must_use]
    pub fn build(self) -> ProcessingRules {
        self.rules
    }
}

//! Named handler implementations used by the behaviour scenarios.

use serde_json::{Value, json};

use crate::envelope::param;
use crate::rules::{Handler, HandlerError};

/// Handler behind a scenario call description, or `None` for an unknown one.
#[must_use]
pub fn rule_for(call: &str) -> Option<Handler> {
    let handler = match call {
        "add two numbers" => Handler::new(|params| {
            let left = param(params, 0)?.as_integer()?;
            let right = param(params, 1)?.as_integer()?;
            Ok(json!(left + right))
        }),
        "increment number" => Handler::new(|params| Ok(json!(param(params, 0)?.as_integer()? + 1))),
        "echo the request" => Handler::new(|params| Ok(param(params, 0)?.value().clone())),
        "return null" => Handler::new(|_| Ok(Value::Null)),
        "fail with an error" => Handler::new(|_| Err(HandlerError::failed("faulty user code"))),
        "throw exception" => Handler::new(|_| panic!("faulty user code")),
        _ => return None,
    };
    Some(handler)
}

//! JSON wire form of request and response envelopes.
//!
//! Inbound bodies look like:
//!
//! ```json
//! {"method":"add","params":[2,3],"id":"X1"}
//! ```
//!
//! `params` defaults to an empty list and `id` falls back to the delivery tag
//! of the carrying message. Outbound bodies always carry all three fields:
//!
//! ```json
//! {"result":5,"error":null,"id":"X1"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{DeliveryHandle, ParamAccessor, Request, Response};

/// Errors raised while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The body was not valid JSON or did not match the envelope schema.
    #[error("malformed envelope: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The envelope parsed but a required field was blank.
    #[error("invalid envelope: {message}")]
    InvalidStructure {
        /// Description of the violated constraint.
        message: String,
    },
    /// A response could not be serialized.
    #[error("failed to serialize response: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl EnvelopeError {
    fn malformed(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source,
        }
    }

    fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RequestJson {
    method: String,
    #[serde(default)]
    params: Vec<Value>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResponseJson {
    result: Value,
    error: Option<String>,
    id: String,
}

/// Decodes one inbound message body.
///
/// # Errors
///
/// Returns [`EnvelopeError::Malformed`] for invalid JSON or a missing
/// `method`, and [`EnvelopeError::InvalidStructure`] for a blank method.
pub fn decode_request(body: &[u8], handle: DeliveryHandle) -> Result<Request, EnvelopeError> {
    let json: RequestJson = serde_json::from_slice(body).map_err(EnvelopeError::malformed)?;

    if json.method.trim().is_empty() {
        return Err(EnvelopeError::invalid_structure("method field is empty"));
    }

    let id = json
        .id
        .unwrap_or_else(|| handle.as_str().to_owned());
    let params = json.params.into_iter().map(ParamAccessor::new).collect();
    Ok(Request::new(id, json.method, params, handle))
}

/// Encodes a response body.
///
/// # Errors
///
/// Returns [`EnvelopeError::Serialize`] if the result cannot be serialized.
pub fn encode_response(response: &Response) -> Result<String, EnvelopeError> {
    let json = ResponseJson {
        result: response.result().clone(),
        error: response.error().map(str::to_owned),
        id: response.id().to_owned(),
    };
    serde_json::to_string(&json).map_err(EnvelopeError::Serialize)
}

/// Decodes a response body, as published by [`encode_response`].
///
/// # Errors
///
/// Returns [`EnvelopeError::Malformed`] when the body does not match the
/// response schema.
pub fn decode_response(body: &str) -> Result<Response, EnvelopeError> {
    let json: ResponseJson = serde_json::from_str(body).map_err(EnvelopeError::malformed)?;
    Ok(match json.error {
        Some(message) => Response::failure(json.id, message),
        None => Response::success(json.id, json.result),
    })
}

//! Typed access to request parameters.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised when a parameter is missing or has an unexpected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Fewer parameters were supplied than the handler reads.
    #[error("missing parameter at position {index}")]
    Missing {
        /// Zero-based position that was requested.
        index: usize,
    },
    /// The parameter could not be read as the requested type.
    #[error("expected {expected} but found {found}")]
    WrongType {
        /// Name of the requested type.
        expected: &'static str,
        /// Compact JSON rendering of the actual value.
        found: String,
    },
}

impl ParamError {
    fn wrong_type(expected: &'static str, value: &Value) -> Self {
        Self::WrongType {
            expected,
            found: value.to_string(),
        }
    }
}

/// One positional parameter of a request.
///
/// The accessor wraps the raw JSON value and offers typed extraction so
/// handlers do not need to match on [`Value`] themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamAccessor {
    value: Value,
}

impl ParamAccessor {
    /// Wraps a raw JSON value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self { value }
    }

    /// Raw JSON value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the accessor and returns the raw value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Reads the parameter as a signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::WrongType`] when the value is not an integer.
    pub fn as_integer(&self) -> Result<i64, ParamError> {
        self.value
            .as_i64()
            .ok_or_else(|| ParamError::wrong_type("integer", &self.value))
    }

    /// Reads the parameter as a floating point number. Integers are widened.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::WrongType`] when the value is not numeric.
    pub fn as_float(&self) -> Result<f64, ParamError> {
        self.value
            .as_f64()
            .ok_or_else(|| ParamError::wrong_type("number", &self.value))
    }

    /// Reads the parameter as a string slice.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::WrongType`] when the value is not a string.
    pub fn as_string(&self) -> Result<&str, ParamError> {
        self.value
            .as_str()
            .ok_or_else(|| ParamError::wrong_type("string", &self.value))
    }

    /// Reads the parameter as a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::WrongType`] when the value is not a boolean.
    pub fn as_bool(&self) -> Result<bool, ParamError> {
        self.value
            .as_bool()
            .ok_or_else(|| ParamError::wrong_type("boolean", &self.value))
    }

    /// Reads the parameter as a list of integers.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::WrongType`] when the value is not an array or an
    /// element is not an integer.
    pub fn as_integer_list(&self) -> Result<Vec<i64>, ParamError> {
        let items = self
            .value
            .as_array()
            .ok_or_else(|| ParamError::wrong_type("list of integers", &self.value))?;
        items
            .iter()
            .map(|item| {
                item.as_i64()
                    .ok_or_else(|| ParamError::wrong_type("integer", item))
            })
            .collect()
    }

    /// Reads the parameter as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::WrongType`] when the value is not an object.
    pub fn as_map(&self) -> Result<&Map<String, Value>, ParamError> {
        self.value
            .as_object()
            .ok_or_else(|| ParamError::wrong_type("map", &self.value))
    }
}

impl From<Value> for ParamAccessor {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Returns the parameter at `index`.
///
/// # Errors
///
/// Returns [`ParamError::Missing`] when fewer parameters were supplied.
pub fn param(params: &[ParamAccessor], index: usize) -> Result<&ParamAccessor, ParamError> {
    params.get(index).ok_or(ParamError::Missing { index })
}

/// Renders parameters as a comma-separated list of compact JSON values.
pub(crate) fn render_params(params: &[ParamAccessor]) -> String {
    params
        .iter()
        .map(|param| param.value().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

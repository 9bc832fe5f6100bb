//! Itemised validation failures.
//!
//! Request bodies are rejected with a list of `{path, message}` pairs, one per
//! offending field, so clients can highlight each field individually.

use serde::{Deserialize, Serialize};

/// A single field-level validation failure.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path of the field, e.g. `contactInfo.email` or `images[1]`
    pub path: String,
    /// Human readable reason
    pub message: String,
}

impl FieldError {
    /// Create a field error
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

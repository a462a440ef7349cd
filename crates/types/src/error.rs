//! Errors raised while interpreting wire payloads.

use thiserror::Error;

/// Malformed protocol input. Connections drop the offending message and
/// stay open.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid value {value} for attribute {attribute}")]
    InvalidAttributeValue { attribute: String, value: String },
}

//! Error types for the API client core.
//!
//! # Design
//! Every failure the core detects surfaces as one `ApiError` variant and is
//! returned to the immediate caller; nothing is caught or retried internally.
//! `Transport` means the exchange never completed, `Http` means the server
//! answered with a failure status. Both carry a status code so that an HTTP
//! server embedding the client can forward it instead of a blanket 500.

use thiserror::Error;

/// Errors returned by the request pipeline, models and collections.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The executor could not complete the exchange (DNS, connect, TLS,
    /// timeout).
    #[error("transport failure ({status}): {message}")]
    Transport { status: u16, message: String },

    /// The server returned a status code of 400 or above. `message` is the
    /// `message` field of the error body.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// No endpoint is registered under this name.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// No model definition is registered under this name.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A collection was built from something that is neither a list of items
    /// nor a response.
    #[error("{0} needs to be a response or a list of items")]
    MalformedInput(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A response value could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The client configuration is missing a field or holds an invalid value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// The HTTP status this error should be rendered with.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Transport { status, .. } | ApiError::Http { status, .. } if *status != 0 => {
                *status
            }
            _ => 500,
        }
    }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

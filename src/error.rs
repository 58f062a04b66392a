// src/error.rs
use thiserror::Error;

/// Failure of a single round-trip to the registry, before the client
/// attaches the operation it was performing.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode registry response: {0}")]
    Decode(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by [`RegistryClient`](crate::client::RegistryClient).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to initialise registry client for '{address}': {reason}")]
    Connection { address: String, reason: String },

    #[error("failed to register service instance '{id}': {source}")]
    Registration {
        id: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to deregister service instance '{id}': {source}")]
    Deregistration {
        id: String,
        #[source]
        source: TransportError,
    },

    #[error("query for service '{service}' failed: {source}")]
    Query {
        service: String,
        #[source]
        source: TransportError,
    },

    #[error("service ( {0} ) was not found")]
    NotFound(String),
}

impl RegistryError {
    /// The registry answered, but no passing instance exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }

    /// The registry could not be asked at all.
    pub fn is_query_failure(&self) -> bool {
        matches!(self, RegistryError::Query { .. })
    }
}

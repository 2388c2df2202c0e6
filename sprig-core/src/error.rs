//! Error types for Sprig operations

use std::time::Duration;
use thiserror::Error;

/// Failures reported by a remote tree gateway.
///
/// `Clone` so one failure can be handed to every caller joined on a shared
/// fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Request to {endpoint} failed with status {status}: {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Transport failure talking to {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

/// Master error type for the tree cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("No active scope selected")]
    NoActiveScope,

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Timed out after {waited:?} waiting for in-flight children of {parent_id}")]
    JoinTimeout { parent_id: String, waited: Duration },

    #[error("Fetch for {key} did not settle: {reason}")]
    FetchAborted { key: String, reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Invalid tree node id '{id}': {reason}")]
    InvalidNodeId { id: String, reason: String },
}

impl CacheError {
    /// Whether this error came back from the remote service rather than a
    /// local precondition.
    pub fn is_gateway(&self) -> bool {
        matches!(self, CacheError::Gateway(_))
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================

//! Adapter error types.
//!
//! All collaborator calls surface errors through [`AdapterError`]. Each
//! variant carries enough context for callers to decide how to handle
//! the failure without inspecting opaque strings. Workflows catch these
//! at their boundary and turn them into user-facing messages.

/// Unified error type for baubot adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The adapter is missing required configuration (URL, token, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// An outbound request could not be completed.
    #[error("request failed for `{operation}`: {reason}")]
    RequestFailed { operation: String, reason: String },

    /// The remote service answered with something we cannot use.
    #[error("unexpected response from `{operation}`: {reason}")]
    InvalidResponse { operation: String, reason: String },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

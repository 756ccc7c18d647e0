//! Error taxonomy for the workflow layer.
//!
//! Workflows distinguish four failure classes because they produce
//! different user-facing messages: bad input, an unresolvable project
//! reference, a collaborator (storage/calendar) failure, and a
//! persistence failure. All of them are caught at the workflow
//! boundary; nothing here ever propagates past the dispatcher.

use thiserror::Error;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the workflow layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// User input failed validation; reported verbatim, no side effect.
    #[error("{0}")]
    Validation(String),

    /// A project reference could not be resolved.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// An external collaborator (storage, calendar) failed.
    #[error(transparent)]
    Collaborator(#[from] baubot_adapters::AdapterError),

    /// The persistence store failed.
    #[error(transparent)]
    Store(#[from] baubot_store::StoreError),

    /// Configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(String),
}

//! Error taxonomy shared by the bulk, automation and analytics engines
//!
//! `ProviderError` is what the remote data provider reports for a single call.
//! `CoreError` is what the engines report to their callers.

use thiserror::Error;

/// Failure of a single call against the remote project system
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("authentication rejected: {0}")]
    Unauthorized(String),

    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Transport-level failures that a caller may reasonably try again
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Errors surfaced by the engines
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input, always raised before any remote call
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Some but not all items of a bulk operation failed
    #[error("{failed} of {total} items failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Remote(ProviderError),
}

impl From<ProviderError> for CoreError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Unauthorized(msg) | ProviderError::AccessDenied(msg) => {
                CoreError::AuthenticationFailure(msg)
            }
            ProviderError::Unavailable(msg) => CoreError::RemoteUnavailable(msg),
            ProviderError::Timeout(after) => {
                CoreError::RemoteUnavailable(format!("request timed out after {:?}", after))
            }
            ProviderError::NotFound(msg) => CoreError::NotFound(msg),
            other => CoreError::Remote(other),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

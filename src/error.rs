//! Error taxonomy for grid operations.
//!
//! `InvalidArgument` and `NotFound` leave the state untouched.
//! `StorageFailure` aborts a mutation before anything is broadcast.

use thiserror::Error;

use crate::network::auth::AuthError;
use crate::store::StoreError;

/// All errors a grid request can end in.
#[derive(Debug, Error)]
pub enum GridError {
    /// Missing or malformed mutation input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Hide target does not resolve to a visible slot.
    #[error("box number {0} not found or already hidden")]
    NotFound(u32),

    /// Missing, invalid or expired credential.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// Persistence layer unreachable or failed on write.
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StoreError),
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

impl GridError {
    /// Shorthand for [`GridError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        GridError::InvalidArgument(msg.into())
    }

    /// Check if this is an authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GridError::Unauthorized(_))
    }
}

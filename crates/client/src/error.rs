//! Top-level error for [`crate::Cartify`] operations.

use thiserror::Error;

use cartify_core::ValidationError;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Any failure surfaced by the Cartify context.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ClientError {
    /// Whether the user has to sign in (again) before retrying.
    #[must_use]
    pub const fn is_auth_required(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_auth_required())
    }
}

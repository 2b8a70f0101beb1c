//! Subcommand implementations.

pub mod messages;
pub mod seller;
pub mod session;
pub mod shop;

use thiserror::Error;

use cartify_client::{ApiError, ClientError};
use cartify_core::ValidationError;

/// Errors surfaced by a subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The command needs a signed-in user.
    #[error("Not signed in. Run `cartify login` first")]
    NotSignedIn,

    /// The command needs a different role.
    #[error("This command is only available to {0} accounts")]
    WrongRole(cartify_core::Role),

    /// Neither `CARTIFY_PASSWORD` nor `--password-stdin` supplied one.
    #[error("No password given. Set CARTIFY_PASSWORD or pass --password-stdin")]
    MissingPassword,

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Fail unless someone is signed in.
pub fn require_session(cartify: &cartify_client::Cartify) -> Result<(), CommandError> {
    if cartify.auth().is_authenticated() {
        Ok(())
    } else {
        Err(CommandError::NotSignedIn)
    }
}

//! Collaborator error type.

use thiserror::Error;

/// Error from an external collaborator call.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator was unreachable, timed out, or answered with an
    /// error status.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

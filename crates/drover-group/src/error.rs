//! Group composition errors.

use thiserror::Error;

use drover_spi::{InterfaceId, SpiError};

/// Result alias for group composition operations.
pub type GroupResult<T> = Result<T, GroupError>;

/// Errors raised while composing or validating a group.
#[derive(Debug, Error)]
pub enum GroupError {
    /// A plugin advertises an interface the group layer was not written
    /// against.
    #[error("plugin speaks {offered}, this build requires {required}")]
    IncompatibleInterface {
        offered: InterfaceId,
        required: InterfaceId,
    },

    /// The group definition could not be canonically encoded for
    /// hashing.
    #[error("failed to encode group config: {0}")]
    Encode(#[from] serde_json::Error),

    /// A plugin rejected part of the group definition.
    #[error(transparent)]
    Plugin(#[from] SpiError),
}

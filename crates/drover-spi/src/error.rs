//! Error surface shared by the plugin contracts.

use thiserror::Error;

use crate::instance::InstanceId;

/// Result alias for plugin operations.
pub type SpiResult<T> = Result<T, SpiError>;

/// Errors a plugin implementation may surface to its callers.
///
/// Callers treat every variant as retryable at the next observation pass;
/// none of them terminates a running supervisor.
#[derive(Debug, Error)]
pub enum SpiError {
    /// The supplied properties document is not supported by this plugin.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfig(String),

    /// The instance does not exist on the backend.
    #[error("instance not found: {0}")]
    NotFound(InstanceId),

    /// Backend-specific failure (provider API, transport, quota).
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

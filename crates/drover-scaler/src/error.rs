//! Supervisor construction errors.

use thiserror::Error;

/// Errors that prevent a supervisor from being constructed.
///
/// These cover configuration only. Runtime failures (list, create,
/// destroy) are logged and retried on the next pass; they never surface
/// as errors from a running supervisor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScalerError {
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("quorum requires at least one logical identity")]
    EmptyQuorum,
}

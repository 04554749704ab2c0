//! Error types for lamina-nest.

use thiserror::Error;

/// Result type alias for lamina-nest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating or optimizing a cutting plan.
///
/// A piece that cannot be placed is *not* an error: it is skipped and shows up
/// in the unplaced count and the fitness penalty.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or degenerate polygon input.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The request asks for zero pieces in total.
    #[error("No pieces requested: total quantity is zero")]
    EmptyRequest,

    /// Out-of-range parameters or an undecodable request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A parallel fitness evaluation failed; the whole run is aborted.
    #[error("Fitness evaluation failed: {0}")]
    WorkerFailure(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error was caused by bad input rather than by the optimizer.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidGeometry(_) | Error::EmptyRequest | Error::InvalidRequest(_)
        )
    }

    /// HTTP-equivalent status code: 400 for bad input, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidGeometry(_) => "invalid_geometry",
            Error::EmptyRequest => "empty_request",
            Error::InvalidRequest(_) => "invalid_request",
            Error::WorkerFailure(_) => "worker_failure",
            Error::Internal(_) => "internal",
        }
    }
}

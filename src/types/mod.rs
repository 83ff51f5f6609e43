//! Crate-wide error taxonomy and result alias.

use thiserror::Error;

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Convenience alias used across the client surface.
pub type Result<T> = std::result::Result<T, PenumbraError>;

/// Structured errors surfaced by the client shell.
///
/// The AST pipeline itself is total and never produces one of these; every
/// variant originates in configuration validation or the execution path.
#[derive(Debug, Error)]
pub enum PenumbraError {
    /// Configuration failed validation or could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The underlying transport reported a failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A statement exceeded the configured timeout.
    #[error("statement timed out after {elapsed_ms} ms")]
    Timeout {
        /// Milliseconds elapsed before the attempt was abandoned.
        elapsed_ms: u64,
    },
    /// The circuit breaker is open and rejected the statement outright.
    #[error("circuit breaker is open")]
    CircuitOpen,
    /// Every permitted attempt failed; the last failure is attached.
    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Failure observed on the final attempt.
        #[source]
        source: Box<PenumbraError>,
    },
}

impl PenumbraError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            PenumbraError::Config(_) => "Config",
            PenumbraError::Transport(_) => "Transport",
            PenumbraError::Timeout { .. } => "Timeout",
            PenumbraError::CircuitOpen => "CircuitOpen",
            PenumbraError::RetriesExhausted { .. } => "RetriesExhausted",
        }
    }

    /// Whether a retry policy may re-attempt after this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            PenumbraError::Transport(err) => err.is_retryable(),
            PenumbraError::Timeout { .. } => true,
            PenumbraError::Config(_)
            | PenumbraError::CircuitOpen
            | PenumbraError::RetriesExhausted { .. } => false,
        }
    }
}

//! The execution seam between this crate and an actual graph driver.
//!
//! Penumbra performs no network I/O. Callers implement [`GraphTransport`]
//! over whatever driver they use; the client shell wraps that transport
//! with retry, timeout, and circuit-breaker policies.

use std::future::Future;

use thiserror::Error;

use crate::query::CompiledQuery;

/// Failures reported by the underlying driver.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// An established connection dropped mid-statement.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// The server session expired and must be re-established.
    #[error("session expired")]
    SessionExpired,
    /// The server rejected the statement itself.
    #[error("statement rejected: {0}")]
    Statement(String),
}

impl TransportError {
    /// Whether a fresh attempt could plausibly succeed.
    ///
    /// Statement rejections are deterministic and never retried; connection
    /// and session failures are transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Statement(_))
    }
}

/// Driver boundary: submits one compiled statement and yields a
/// driver-defined output (a result stream, a summary, row counts — this
/// crate does not interpret it).
pub trait GraphTransport {
    /// Output produced by a successful run.
    type Output;

    /// Submits the statement.
    fn run(
        &self,
        statement: CompiledQuery,
    ) -> impl Future<Output = Result<Self::Output, TransportError>> + Send;
}

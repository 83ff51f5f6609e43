//! Client shell wiring the AST pipeline to a transport.
//!
//! [`GraphClient`] owns the validated configuration, the compiled-statement
//! cache, and the resilience policies. Executing a query is: fingerprint,
//! cache lookup (normalize + compile on miss), breaker admission, then a
//! retry loop with a per-attempt timeout and latency recording.

use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::metrics::{LatencySnapshot, LatencyTracker};
use crate::query::{
    canonicalize, compile, digest, fingerprint, CompiledQuery, PlanCache, Query,
};
use crate::resilience::{BreakerState, CircuitBreaker, RetryPolicy};
use crate::transport::GraphTransport;
use crate::types::{PenumbraError, Result};

/// Graph database client: AST pipeline plus policy-wrapped execution over a
/// caller-supplied transport.
#[derive(Debug)]
pub struct GraphClient<T> {
    config: ClientConfig,
    transport: T,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    cache: Mutex<PlanCache>,
    latency: LatencyTracker,
}

impl<T: GraphTransport> GraphClient<T> {
    /// Validates `config` and wraps `transport` with the configured
    /// policies.
    pub fn connect(config: ClientConfig, transport: T) -> Result<Self> {
        config.validate()?;
        info!(uri = %config.uri, "graph client configured");
        Ok(Self {
            retry: RetryPolicy::new(&config.retry),
            breaker: CircuitBreaker::new(&config.breaker),
            cache: Mutex::new(PlanCache::new(config.plan_cache_size)),
            latency: LatencyTracker::new(config.latency_window),
            config,
            transport,
        })
    }

    /// Fingerprints `query` and returns its compiled form, consulting the
    /// plan cache so equivalent queries compile once.
    pub fn prepare(&self, query: &Query) -> (String, CompiledQuery) {
        let digest = fingerprint(query);
        if let Some(hit) = self.cache.lock().get(&digest) {
            debug!(%digest, "plan cache hit");
            return (digest, hit);
        }
        let compiled = compile(&canonicalize(query));
        self.cache.lock().insert(digest.clone(), compiled.clone());
        debug!(%digest, text = %compiled.text, "statement compiled");
        (digest, compiled)
    }

    /// Executes a query through the full pipeline.
    pub async fn execute(&self, query: &Query) -> Result<T::Output> {
        let (digest, statement) = self.prepare(query);
        self.run_with_policies(&digest, statement).await
    }

    /// Executes a pre-rendered statement, bypassing the AST pipeline.
    pub async fn execute_compiled(&self, statement: CompiledQuery) -> Result<T::Output> {
        let digest = digest(&statement.text);
        self.run_with_policies(&digest, statement).await
    }

    async fn run_with_policies(
        &self,
        digest: &str,
        statement: CompiledQuery,
    ) -> Result<T::Output> {
        if !self.breaker.admit() {
            return Err(PenumbraError::CircuitOpen);
        }
        let timeout = self.config.statement_timeout();
        let mut attempt = 1u32;
        loop {
            let started = Instant::now();
            let outcome =
                tokio::time::timeout(timeout, self.transport.run(statement.clone())).await;
            let elapsed = started.elapsed();
            let error = match outcome {
                Ok(Ok(output)) => {
                    self.latency.record(elapsed);
                    self.breaker.record_success();
                    debug!(
                        digest,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "statement completed"
                    );
                    return Ok(output);
                }
                Ok(Err(err)) => PenumbraError::Transport(err),
                Err(_) => PenumbraError::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                },
            };
            self.breaker.record_failure();
            if !error.is_retryable() {
                return Err(error);
            }
            if attempt >= self.retry.max_attempts() {
                // A single-attempt policy surfaces the raw failure.
                return Err(if attempt == 1 {
                    error
                } else {
                    PenumbraError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(error),
                    }
                });
            }
            let delay = self.retry.delay_for(attempt);
            warn!(
                digest,
                attempt,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "statement failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
            if !self.breaker.admit() {
                return Err(PenumbraError::CircuitOpen);
            }
        }
    }

    /// Latency summary for recent statements.
    pub fn latency(&self) -> LatencySnapshot {
        self.latency.snapshot()
    }

    /// Current circuit breaker state.
    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    /// Number of statements currently cached.
    pub fn cached_statements(&self) -> usize {
        self.cache.lock().len()
    }

    /// The validated configuration in effect.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

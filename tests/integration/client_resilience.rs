//! Execution-shell behavior against mock transports: retries, breaker
//! transitions, timeouts, latency tracking, and plan caching.
#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use penumbra::config::{BreakerConfig, ClientConfig, RetryConfig};
use penumbra::query::{find_by_label, CompiledQuery};
use penumbra::resilience::BreakerState;
use penumbra::transport::{GraphTransport, TransportError};
use penumbra::{GraphClient, PenumbraError};

/// Fails the first `failures` calls with a retryable error, then succeeds
/// with the call count.
struct FlakyTransport {
    failures: u32,
    calls: Arc<AtomicU32>,
}

impl GraphTransport for FlakyTransport {
    type Output = u32;

    async fn run(&self, _statement: CompiledQuery) -> Result<u32, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(TransportError::ConnectionLost("mock reset".into()))
        } else {
            Ok(call)
        }
    }
}

/// Always rejects the statement (a deterministic, non-retryable failure).
struct RejectingTransport {
    calls: Arc<AtomicU32>,
}

impl GraphTransport for RejectingTransport {
    type Output = ();

    async fn run(&self, _statement: CompiledQuery) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Statement("unknown label".into()))
    }
}

/// Sleeps past any reasonable statement timeout.
struct HangingTransport;

impl GraphTransport for HangingTransport {
    type Output = ();

    async fn run(&self, _statement: CompiledQuery) -> Result<(), TransportError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// Succeeds immediately, remembering every statement text it received.
struct RecordingTransport {
    texts: Arc<Mutex<Vec<String>>>,
}

impl GraphTransport for RecordingTransport {
    type Output = ();

    async fn run(&self, statement: CompiledQuery) -> Result<(), TransportError> {
        self.texts.lock().push(statement.text);
        Ok(())
    }
}

fn fast_config(max_attempts: u32) -> ClientConfig {
    ClientConfig {
        statement_timeout_ms: 1_000,
        retry: RetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter: 0.0,
        },
        breaker: BreakerConfig {
            failure_threshold: 100,
            cool_down_ms: 60_000,
        },
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn retries_recover_from_transient_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let client = GraphClient::connect(
        fast_config(3),
        FlakyTransport {
            failures: 2,
            calls: Arc::clone(&calls),
        },
    )
    .unwrap();
    let output = client.execute(&find_by_label("p", "Person")).await.unwrap();
    assert_eq!(output, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(client.breaker_state(), BreakerState::Closed);
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let client = GraphClient::connect(
        fast_config(2),
        FlakyTransport {
            failures: 10,
            calls: Arc::clone(&calls),
        },
    )
    .unwrap();
    let err = client
        .execute(&find_by_label("p", "Person"))
        .await
        .unwrap_err();
    match err {
        PenumbraError::RetriesExhausted { attempts, source } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*source, PenumbraError::Transport(_)));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn statement_rejections_are_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let client = GraphClient::connect(
        fast_config(5),
        RejectingTransport {
            calls: Arc::clone(&calls),
        },
    )
    .unwrap();
    let err = client
        .execute(&find_by_label("p", "Person"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PenumbraError::Transport(TransportError::Statement(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn slow_statements_time_out() {
    let config = ClientConfig {
        statement_timeout_ms: 20,
        retry: RetryConfig {
            max_attempts: 1,
            base_delay_ms: 1,
            max_delay_ms: 1,
            jitter: 0.0,
        },
        ..ClientConfig::default()
    };
    let client = GraphClient::connect(config, HangingTransport).unwrap();
    let err = client
        .execute(&find_by_label("p", "Person"))
        .await
        .unwrap_err();
    assert!(matches!(err, PenumbraError::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn breaker_opens_after_consecutive_failures_and_rejects_outright() {
    let calls = Arc::new(AtomicU32::new(0));
    let config = ClientConfig {
        retry: RetryConfig {
            max_attempts: 1,
            base_delay_ms: 1,
            max_delay_ms: 1,
            jitter: 0.0,
        },
        breaker: BreakerConfig {
            failure_threshold: 1,
            cool_down_ms: 60_000,
        },
        ..ClientConfig::default()
    };
    let client = GraphClient::connect(
        config,
        FlakyTransport {
            failures: u32::MAX,
            calls: Arc::clone(&calls),
        },
    )
    .unwrap();
    let query = find_by_label("p", "Person");

    let first = client.execute(&query).await.unwrap_err();
    assert!(matches!(first, PenumbraError::Transport(_)));
    assert_eq!(client.breaker_state(), BreakerState::Open);

    let second = client.execute(&query).await.unwrap_err();
    assert!(matches!(second, PenumbraError::CircuitOpen));
    // The open breaker never reached the transport.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn breaker_recovers_through_a_half_open_probe() {
    let calls = Arc::new(AtomicU32::new(0));
    let config = ClientConfig {
        retry: RetryConfig {
            max_attempts: 1,
            base_delay_ms: 1,
            max_delay_ms: 1,
            jitter: 0.0,
        },
        breaker: BreakerConfig {
            failure_threshold: 1,
            cool_down_ms: 1,
        },
        ..ClientConfig::default()
    };
    let client = GraphClient::connect(
        config,
        FlakyTransport {
            failures: 1,
            calls: Arc::clone(&calls),
        },
    )
    .unwrap();
    let query = find_by_label("p", "Person");

    assert!(client.execute(&query).await.is_err());
    assert_eq!(client.breaker_state(), BreakerState::Open);

    tokio::time::sleep(Duration::from_millis(5)).await;
    client.execute(&query).await.unwrap();
    assert_eq!(client.breaker_state(), BreakerState::Closed);
}

#[tokio::test]
async fn execution_populates_latency_and_plan_cache() {
    let texts = Arc::new(Mutex::new(Vec::new()));
    let client = GraphClient::connect(
        ClientConfig::default(),
        RecordingTransport {
            texts: Arc::clone(&texts),
        },
    )
    .unwrap();
    let query = find_by_label("p", "Person");

    client.execute(&query).await.unwrap();
    client.execute(&query).await.unwrap();

    let snapshot = client.latency();
    assert_eq!(snapshot.recorded, 2);
    assert!(snapshot.p50.is_some());
    assert_eq!(client.cached_statements(), 1);

    let texts = texts.lock();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], "MATCH (p:Person) RETURN p");
    assert_eq!(texts[0], texts[1]);
}

#[tokio::test]
async fn execute_compiled_bypasses_the_ast_pipeline() {
    let texts = Arc::new(Mutex::new(Vec::new()));
    let client = GraphClient::connect(
        ClientConfig::default(),
        RecordingTransport {
            texts: Arc::clone(&texts),
        },
    )
    .unwrap();
    let statement = CompiledQuery {
        text: "MATCH (n) RETURN count(n)".to_owned(),
        parameters: Default::default(),
    };
    client.execute_compiled(statement).await.unwrap();
    assert_eq!(client.cached_statements(), 0);
    assert_eq!(texts.lock()[0], "MATCH (n) RETURN count(n)");
}

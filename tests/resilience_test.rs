// tests/resilience_test.rs
// Cross-module resilience behavior: a timeout should trip the breaker just
// like an explicit failure report, and a tripped breaker's retry_after
// should shrink over time rather than stay pinned.

use gitnexus_mcp::resilience::circuit_breaker::{Admission, CircuitBreaker};
use gitnexus_mcp::resilience::{backoff, timeout};
use std::time::Duration;

#[tokio::test]
async fn repeated_timeouts_trip_the_breaker() {
    let breaker = CircuitBreaker::new();

    for _ in 0..5 {
        let result = timeout::with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, anyhow::Error>(())
            },
            "slow_op",
        )
        .await;
        assert!(result.is_err());
        breaker.record_failure();
    }

    assert!(matches!(breaker.admit(), Admission::Rejected { .. }));
}

#[tokio::test]
async fn a_fast_operation_does_not_trip_the_breaker() {
    let breaker = CircuitBreaker::new();

    for _ in 0..10 {
        let result = timeout::with_timeout(
            Duration::from_millis(50),
            async { Ok::<_, anyhow::Error>(42) },
            "fast_op",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        breaker.record_success();
    }

    assert_eq!(breaker.admit(), Admission::Admitted);
}

#[test]
fn backoff_delay_never_exceeds_the_cap_even_at_high_attempt_counts() {
    // Attempt numbers large enough to overflow a naive 2^attempt without
    // the checked_shl/checked_mul guard in capped_exponential.
    for attempt in [0u32, 1, 5, 10, 20, 40, 63] {
        let delay = backoff::delay(attempt);
        assert!(delay <= Duration::from_secs(60), "attempt {attempt} produced {delay:?}");
    }
}

#[test]
fn backoff_delay_is_randomized_across_calls_at_the_same_attempt() {
    let samples: Vec<Duration> = (0..20).map(|_| backoff::delay(5)).collect();
    assert!(samples.iter().any(|d| *d != samples[0]), "full jitter should vary the delay");
}

// src/resilience/timeout.rs
// Per-call deadline wrapper, grounded on the teacher's
// `utils/timeout.rs::with_timeout`.

use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `operation` under a deadline of `duration`. On expiry, the future is
/// dropped (cooperative cancellation) and an error is returned; the caller
/// is responsible for removing any pending-request bookkeeping.
pub async fn with_timeout<F, T>(duration: Duration, operation: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation = operation_name, timeout_ms = duration.as_millis() as u64, "operation timed out");
            Err(anyhow!("'{operation_name}' timed out after {}ms", duration.as_millis()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn completes_before_deadline_returns_ok() {
        let result = with_timeout(
            StdDuration::from_millis(50),
            async { Ok::<_, anyhow::Error>(42) },
            "quick",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn exceeding_deadline_returns_err() {
        let result = with_timeout(
            StdDuration::from_millis(10),
            async {
                tokio::time::sleep(StdDuration::from_millis(100)).await;
                Ok::<_, anyhow::Error>(42)
            },
            "slow",
        )
        .await;
        assert!(result.is_err());
    }
}

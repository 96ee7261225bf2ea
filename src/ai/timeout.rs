//! Timeout Helpers
//!
//! Wraps async operations with a deadline and a consistent
//! `TripError::Timeout` carrying the operation name for diagnosis.

use std::future::Future;
use std::time::Duration;

use crate::types::{Result, TripError};

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the
/// specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TripError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, TripError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, TripError>(42)
            },
            "slow operation",
        )
        .await;
        match result.unwrap_err() {
            TripError::Timeout {
                operation,
                duration,
            } => {
                assert_eq!(operation, "slow operation");
                assert_eq!(duration, Duration::from_millis(10));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}

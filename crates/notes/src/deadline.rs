//! Per-call time limits for external collaborators.

use recall_core::AppError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why a bounded call produced no value.
#[derive(Debug, Error)]
pub(crate) enum CallError {
    #[error("timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    #[error(transparent)]
    Failed(#[from] AppError),
}

/// Await `call`, giving up after `limit`.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(CallError::TimedOut(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_value_passes_through() {
        let value = bounded(Duration::from_secs(1), async { Ok::<_, AppError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_failure_is_wrapped() {
        let err = bounded(Duration::from_secs(1), async {
            Err::<(), _>(AppError::Index("down".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CallError::Failed(AppError::Index(_))));
        assert_eq!(err.to_string(), "Index error: down");
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let err = bounded(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, AppError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CallError::TimedOut(_)));
        assert_eq!(err.to_string(), "timed out after 50ms");
    }

    #[test]
    fn test_usable_as_std_error() {
        let boxed: Box<dyn std::error::Error> = Box::new(CallError::from(AppError::Store("gone".to_string())));
        assert_eq!(boxed.to_string(), "Store error: gone");

        let boxed: Box<dyn std::error::Error> = Box::new(CallError::TimedOut(Duration::from_secs(2)));
        assert_eq!(boxed.to_string(), "timed out after 2000ms");
    }
}

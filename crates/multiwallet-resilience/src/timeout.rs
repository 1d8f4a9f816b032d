//! Bounded waits on adapter readiness

use multiwallet_error::CoreError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Default bound on a chain connect
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Timeout error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Operation '{operation}' timed out after {duration:?}")]
pub struct TimeoutError {
    /// The operation that timed out
    pub operation: String,
    /// The timeout duration
    pub duration: Duration,
}

/// Execute a future with a timeout
pub async fn with_timeout<T>(
    duration: Duration,
    operation: impl Into<String>,
    future: impl Future<Output = T>,
) -> Result<T, TimeoutError> {
    let op = operation.into();
    timeout(duration, future).await.map_err(|_| TimeoutError {
        operation: op,
        duration,
    })
}

/// Waits for a chain connect, flattening the adapter's own error and the
/// elapsed bound into [`CoreError`]
pub async fn with_connect_timeout<T>(
    chain: &str,
    duration: Duration,
    future: impl Future<Output = multiwallet_error::Result<T>>,
) -> multiwallet_error::Result<T> {
    match with_timeout(duration, format!("connect {chain}"), future).await {
        Ok(result) => result,
        Err(e) => Err(CoreError::ConnectTimeout {
            chain: chain.to_string(),
            millis: e.duration.as_millis() as u64,
        }),
    }
}

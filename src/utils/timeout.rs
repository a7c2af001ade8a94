//! Timeout wrappers and default durations.
//!
//! The protocol engine itself never imposes a deadline on a published request;
//! callers that need one race the operation against [`with_timeout_error`].

use crate::error::{AmiError, Result};
use std::future::Future;
use std::time::Duration;

/// Default timeout for socket-level operations
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for establishing the TCP connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a fallible future with a deadline.
///
/// Returns `AmiError::Timeout` if the deadline elapses first, otherwise the
/// future's own result.
pub async fn with_timeout_error<F, T>(future: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(AmiError::Timeout),
    }
}

//! Retry mechanism for spreadsheet calls
//!
//! Wraps a remote operation in a fixed backoff schedule:
//! - Sleeps for each configured delay after a retryable failure
//! - Makes one final attempt after the last delay
//! - Fails fast on errors that another attempt cannot fix (bad range, auth)
//!
//! Sleeping is async, so a retrying request never blocks a runtime thread.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::config::RetryConfig;
use crate::domain::error::SheetError;
use crate::strings::logs;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delays between attempts; one final attempt follows the last one.
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(&config.delays_ms)
    }

    pub fn new(delays_ms: &[u64]) -> Self {
        Self {
            delays: delays_ms.iter().map(|ms| Duration::from_millis(*ms)).collect(),
        }
    }

    /// A policy that tries exactly once.
    #[cfg(test)]
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    #[cfg(test)]
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Execute an operation with retry logic
    ///
    /// # Arguments
    /// * `op` - Name of the operation for logging (e.g., "append_row")
    /// * `operation` - Async function to execute (a closure returning a future)
    ///
    /// # Returns
    /// The operation result, or the last error once every attempt failed
    pub async fn execute_with_retry<F, Fut, T>(&self, op: &str, operation: F) -> Result<T, SheetError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SheetError>>,
    {
        let mut attempt = 1;
        for delay in &self.delays {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("{}", logs::retry_succeeded(op, attempt));
                    }
                    return Ok(value);
                }
                Err(error) if error.is_retryable() => {
                    let delay_ms = delay.as_millis() as u64;
                    tracing::warn!("{}", logs::retrying(op, attempt, &error.to_string(), delay_ms));
                    sleep(*delay).await;
                }
                Err(error) => return Err(error),
            }
            attempt += 1;
        }

        // Final attempt
        let result = operation().await;
        if result.is_ok() && attempt > 1 {
            tracing::info!("{}", logs::retry_succeeded(op, attempt));
        }
        result
    }
}

use anyhow::Error;
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Retries an HTTP request with configurable attempts and delays
///
/// Transport errors and transient statuses (5xx, 429) are retried; any other
/// response is returned to the caller as-is, including the last transient
/// one once attempts run out.
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
pub async fn with_retry<F, Fut>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<Response, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(response) if !is_transient(response.status()) || attempt > retries => {
                return Ok(response);
            }
            Ok(response) => {
                debug!(
                    "Attempt {}/{} returned {}. Retrying...",
                    attempt,
                    retries,
                    response.status()
                );
            }
            Err(err) => {
                if attempt > retries {
                    return Err(err.into());
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
            }
        }
        attempt += 1;
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

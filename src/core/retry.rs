//! Bounded retries with linear backoff (spec §4.5, §5: `delay = base ·
//! retry_count`).

use std::future::Future;
use tokio::time::Duration;

/// Retry `f` up to `attempts` times with linear backoff (`base * attempt`)
/// between tries. Returns the last error if every attempt fails.
pub async fn with_linear_backoff<T, E, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    for attempt in 1..=attempts.max(1) {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(base_delay * attempt).await;
                }
            }
        }
    }
    Err(last_err.expect("attempts is at least 1"))
}

//! Minimum inter-call delay wrapper for catalog clients (spec §5: "Catalog
//! clients are wrapped with a fixed minimum inter-call delay"). The teacher
//! wraps `TmdbClient` calls with an ad hoc `tokio::sync::Semaphore` in
//! `parse_batch`; this crate generalizes that into one reusable adapter so
//! both the movie and series catalogs share the same limiter (SPEC_FULL.md
//! §5 resolution).

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

pub struct RateLimiter {
    min_interval: Duration,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Block until at least `min_interval` has elapsed since the previous
    /// call through this limiter.
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

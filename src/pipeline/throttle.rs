//! Download rate limiting.
//!
//! Spaces consecutive download invocations so the media index is never hit
//! more than `max_downloads_per_minute` times per minute.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::PipelineSettings;

/// Source of the configured download rate, read on every acquire so a live
/// settings store can change it at runtime.
pub trait RateLimitSource: Send + Sync {
    /// Raw configured value; coerced by the limiter.
    fn max_downloads_per_minute(&self) -> f64;
}

impl RateLimitSource for PipelineSettings {
    fn max_downloads_per_minute(&self) -> f64 {
        self.max_downloads_per_minute
    }
}

/// Fixed rate, mostly for tests and the CLI.
#[derive(Debug, Clone, Copy)]
pub struct FixedRate(pub f64);

impl RateLimitSource for FixedRate {
    fn max_downloads_per_minute(&self) -> f64 {
        self.0
    }
}

/// Trait for download throttling.
#[async_trait]
pub trait DownloadThrottler: Send + Sync {
    /// Wait until the next download may start.
    async fn acquire(&self);
}

/// Floor the configured value to a whole number of at least one.
/// Non-finite and non-positive values become one.
pub fn effective_max_per_minute(raw: f64) -> u32 {
    if raw.is_finite() && raw > 0.0 {
        (raw.floor() as u32).max(1)
    } else {
        1
    }
}

/// Minimum spacing between two grants for the configured rate.
pub fn spacing_for(raw: f64) -> Duration {
    Duration::from_millis(60_000 / u64::from(effective_max_per_minute(raw)))
}

/// Enforces a minimum spacing between consecutive grants.
///
/// Holding the lock while sleeping serializes waiters; tokio's mutex wakes
/// them in FIFO order.
pub struct RateLimiter {
    /// Time of the previous grant, never decreases
    last_grant: Mutex<Option<Instant>>,
    source: Arc<dyn RateLimitSource>,
}

impl RateLimiter {
    pub fn new(source: Arc<dyn RateLimitSource>) -> Self {
        Self {
            last_grant: Mutex::new(None),
            source,
        }
    }

    pub fn with_rate(max_per_minute: f64) -> Self {
        Self::new(Arc::new(FixedRate(max_per_minute)))
    }

    pub fn spacing(&self) -> Duration {
        spacing_for(self.source.max_downloads_per_minute())
    }

    /// Time of the most recent grant.
    pub async fn last_grant(&self) -> Option<Instant> {
        *self.last_grant.lock().await
    }
}

#[async_trait]
impl DownloadThrottler for RateLimiter {
    async fn acquire(&self) {
        let mut last_grant = self.last_grant.lock().await;
        if let Some(previous) = *last_grant {
            let next_available = previous + self.spacing();
            let now = Instant::now();
            if now < next_available {
                let wait = next_available - now;
                debug!("Download slot busy, waiting {:?}", wait);
                crate::metrics::record_rate_limit_wait(wait);
                tokio::time::sleep_until(next_available).await;
            }
        }
        let now = Instant::now();
        *last_grant = Some(last_grant.map_or(now, |previous| previous.max(now)));
    }
}

/// No-op throttler that always allows downloads.
pub struct NoOpThrottler;

#[async_trait]
impl DownloadThrottler for NoOpThrottler {
    async fn acquire(&self) {}
}

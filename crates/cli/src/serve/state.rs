//! Application state and rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use smartbin_classify::ClassificationClient;
use smartbin_pipeline::{Assistant, DepositPipeline, SessionStore};
use smartbin_storage::RecordStore;
use tokio::sync::Mutex;

use super::RATE_LIMIT_WINDOW_SECS;
use crate::app::{CliError, Services};

/// Per-IP request counts: (request count, window start time).
struct IpTracker {
    windows: HashMap<IpAddr, (u64, Instant)>,
    last_prune: Instant,
}

/// In-memory per-IP rate limiter.
pub(crate) struct RateLimiter {
    tracker: Mutex<IpTracker>,
    /// Maximum requests per window.
    pub(crate) max_requests: u64,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: u64) -> Self {
        Self {
            tracker: Mutex::new(IpTracker {
                windows: HashMap::new(),
                last_prune: Instant::now(),
            }),
            max_requests,
        }
    }

    /// Ok if a request from `ip` is allowed, Err(retry_after_secs) otherwise.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        let mut tracker = self.tracker.lock().await;

        // Drop expired windows at most once per window.
        if now.saturating_duration_since(tracker.last_prune).as_secs() >= RATE_LIMIT_WINDOW_SECS {
            tracker.windows.retain(|_, (_, start)| {
                now.saturating_duration_since(*start).as_secs() < RATE_LIMIT_WINDOW_SECS
            });
            tracker.last_prune = now;
        }

        let entry = tracker.windows.entry(ip).or_insert((0, now));

        let elapsed = now.saturating_duration_since(entry.1).as_secs();
        if elapsed >= RATE_LIMIT_WINDOW_SECS {
            entry.0 = 0;
            entry.1 = now;
        }

        entry.0 += 1;
        if entry.0 > self.max_requests {
            Err(RATE_LIMIT_WINDOW_SECS.saturating_sub(elapsed))
        } else {
            Ok(())
        }
    }

    #[cfg(test)]
    async fn tracked_ips(&self) -> usize {
        self.tracker.lock().await.windows.len()
    }
}

/// Application state shared across request handlers.
pub(crate) struct AppState {
    pub(crate) classifier: Arc<ClassificationClient>,
    /// One pipeline for the whole server; a second concurrent deposit is
    /// rejected with 409.
    pub(crate) pipeline: DepositPipeline,
    pub(crate) assistant: Assistant,
    pub(crate) records: Arc<dyn RecordStore>,
    pub(crate) session: Mutex<SessionStore>,
    /// Quality used when a deposit gives a weight but no quality.
    pub(crate) default_quality: u8,
    pub(crate) rate_limiter: RateLimiter,
    /// None = no auth required.
    pub(crate) api_key: Option<String>,
}

impl AppState {
    pub(crate) fn new(services: Services) -> Result<Self, CliError> {
        let session = services.session_store()?;
        Ok(Self {
            classifier: services.classifier.clone(),
            pipeline: services.pipeline(None),
            assistant: services.assistant(),
            records: services.records.clone(),
            session: Mutex::new(session),
            default_quality: services.config.deposit.quality_percent,
            rate_limiter: RateLimiter::new(services.config.server.rate_limit),
            api_key: services
                .config
                .server
                .api_key
                .clone()
                .filter(|k| !k.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn limiter_rejects_after_max_requests() {
        let limiter = RateLimiter::new(2);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiter.check(ip).await.is_ok());
        assert!(limiter.check(ip).await.is_ok());
        let retry = limiter.check(ip).await.unwrap_err();
        assert!(retry <= RATE_LIMIT_WINDOW_SECS);

        let other: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(limiter.check(other).await.is_ok());
    }

    #[tokio::test]
    async fn expired_windows_are_pruned() {
        let limiter = RateLimiter::new(5);
        let start = Instant::now();
        for i in 0..10u8 {
            let ip = IpAddr::from([10, 0, 0, i]);
            assert!(limiter.check_at(ip, start).await.is_ok());
        }
        assert_eq!(limiter.tracked_ips().await, 10);

        let later = start + Duration::from_secs(RATE_LIMIT_WINDOW_SECS + 1);
        let fresh: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(limiter.check_at(fresh, later).await.is_ok());
        assert_eq!(limiter.tracked_ips().await, 1);
    }
}

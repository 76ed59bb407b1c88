//! In-memory sliding-window admission controller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use gatekeep_core::ConfigError;
use gatekeep_core::domain::ClientWindow;
use gatekeep_core::ports::{Admission, AdmissionControl, AdmissionStats, Reap};

use crate::env::parse_env;

/// In-memory admission controller configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(900),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS")?.unwrap_or(defaults.max_requests),
            window: parse_env("RATE_LIMIT_WINDOW_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
        })
    }
}

/// Per-identity sliding-window rate limiter.
///
/// Windows live in a sharded map; the entry guard held for the duration of
/// a check makes prune-and-append atomic per identity.
/// Note: Limits are per-process, not shared across replicas.
pub struct InMemoryRateLimiter {
    windows: DashMap<String, ClientWindow>,
    config: RateLimitConfig,
    admitted: AtomicU64,
    rejected: AtomicU64,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

impl AdmissionControl for InMemoryRateLimiter {
    fn check(&self, identity: &str, now: Instant) -> Admission {
        let mut window = self
            .windows
            .entry(identity.to_string())
            .or_insert_with(|| ClientWindow::new(identity));

        let decision = window.try_admit(now, self.config.max_requests, self.config.window);
        let empty = window.is_empty();
        drop(window);

        // Only a rejection can leave a window empty; don't keep it around.
        if empty {
            self.windows.remove_if(identity, |_, window| window.is_empty());
        }

        match decision {
            Admission::Admitted { remaining } => {
                self.admitted.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(identity = %identity, remaining, "Request admitted");
            }
            Admission::Rejected { retry_after } => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    identity = %identity,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Rate limit exceeded"
                );
            }
        }

        decision
    }

    fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            tracked_identities: self.windows.len(),
        }
    }
}

impl Reap for InMemoryRateLimiter {
    fn name(&self) -> &'static str {
        "admission"
    }

    fn reap(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            window.prune(now, self.config.window);
            !window.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }
}

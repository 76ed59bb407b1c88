//! Application state - shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use gatekeep_core::ConfigError;
use gatekeep_core::ports::{AdmissionControl, IdentityPolicy, Reap, ResultCache};
use gatekeep_infra::{InMemoryRateLimiter, InMemoryResultCache};
use gatekeep_shared::dto::MetricsReport;

use crate::config::AppConfig;

/// Shared application state.
///
/// Every component is constructed here and injected; nothing is global,
/// so tests build an isolated state per case.
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<dyn AdmissionControl>,
    pub identity: Arc<dyn IdentityPolicy>,
    pub reports: Arc<dyn ResultCache<MetricsReport>>,
    pub compute_timeout: Duration,
    /// Derive client addresses from forwarded headers instead of the socket peer.
    pub trust_forwarded_headers: bool,
    reapers: Vec<Arc<dyn Reap>>,
}

impl AppState {
    /// Build the application state from configuration.
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        let limiter = Arc::new(InMemoryRateLimiter::new(config.rate_limit.clone()));
        let reports = Arc::new(InMemoryResultCache::<MetricsReport>::new(
            config.cache.clone(),
        )?);

        tracing::info!(
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window.as_secs(),
            cache_ttl_secs = config.cache.ttl.as_secs(),
            identity = ?config.identity,
            trust_forwarded_headers = config.trust_forwarded_headers,
            "Application state initialized"
        );

        let reapers: Vec<Arc<dyn Reap>> = vec![limiter.clone(), reports.clone()];

        Ok(Self {
            admission: limiter,
            identity: config.identity.build(),
            reports,
            compute_timeout: config.compute_timeout,
            trust_forwarded_headers: config.trust_forwarded_headers,
            reapers,
        })
    }

    /// Components with state for the background reaper to sweep.
    pub fn reapers(&self) -> Vec<Arc<dyn Reap>> {
        self.reapers.clone()
    }
}

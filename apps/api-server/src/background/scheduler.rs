//! Cron-style job scheduler using tokio-cron-scheduler.

use std::sync::Arc;
use std::time::Instant;

use gatekeep_core::ports::Reap;
use gatekeep_infra::env::flag_env;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable scheduler.
    pub enabled: bool,
    /// Cron expression (with seconds) for the reaping pass.
    pub reaper_schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reaper_schedule: "*/30 * * * * *".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: flag_env("SCHEDULER_ENABLED", true),
            reaper_schedule: std::env::var("REAPER_SCHEDULE")
                .unwrap_or_else(|_| Self::default().reaper_schedule),
        }
    }
}

/// Cron job scheduler wrapper. Owns every background job; `shutdown`
/// stops them all.
pub struct Scheduler {
    inner: JobScheduler,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a new scheduler.
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, config })
    }

    /// Add a cron job.
    pub async fn add_cron<F, Fut>(
        &self,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Register the periodic sweep of idle windows and expired entries.
    pub async fn add_reaper(
        &self,
        targets: Vec<Arc<dyn Reap>>,
    ) -> Result<uuid::Uuid, JobSchedulerError> {
        let targets = Arc::new(targets);
        let schedule = self.config.reaper_schedule.clone();

        self.add_cron(&schedule, move || {
            let targets = targets.clone();
            async move {
                reap_all(&targets, Instant::now());
            }
        })
        .await
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.config.enabled {
            tracing::warn!("Scheduler disabled; idle windows and expired entries are not swept periodically");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

/// Run one reaping pass over every target. Returns the total removed.
pub fn reap_all(targets: &[Arc<dyn Reap>], now: Instant) -> usize {
    targets
        .iter()
        .map(|target| {
            let removed = target.reap(now);
            if removed > 0 {
                tracing::info!(component = target.name(), removed, "Reaped stale state");
            }
            removed
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gatekeep_core::ports::{AdmissionControl, ResultCache};
    use gatekeep_infra::{CacheConfig, InMemoryRateLimiter, InMemoryResultCache, RateLimitConfig};

    #[test]
    fn test_reap_all_sweeps_every_target() {
        let t0 = Instant::now();
        let limiter = Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
            max_requests: 5,
            window: Duration::from_secs(10),
        }));
        let cache = Arc::new(
            InMemoryResultCache::<u32>::new(CacheConfig {
                ttl: Duration::from_secs(5),
            })
            .unwrap(),
        );

        limiter.check("10.0.0.1", t0);
        cache.set("a", 1, t0);
        cache.set("b", 2, t0 + Duration::from_secs(10));

        let targets: Vec<Arc<dyn Reap>> = vec![limiter.clone(), cache.clone()];
        assert_eq!(reap_all(&targets, t0 + Duration::from_secs(11)), 2);
        assert_eq!(limiter.stats().tracked_identities, 0);
        assert_eq!(cache.stats().entries, 1);
    }
}

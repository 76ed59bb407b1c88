//! In-memory result cache with TTL expiry and single-flight recomputation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use gatekeep_core::domain::CacheEntry;
use gatekeep_core::ports::{CacheStats, ComputeFuture, Lookup, Reap, ResultCache};
use gatekeep_core::{CacheError, ConfigError};

use super::flight::{self, FlightOutcome};
use crate::env::parse_env;

/// In-memory cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum age at which an entry may still be served.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            ttl: parse_env("CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(Self::default().ttl),
        })
    }
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Keys with a computation running, and the channel its outcome lands on.
    in_flight: HashMap<String, watch::Receiver<FlightOutcome<V>>>,
}

impl<V: Clone> CacheState<V> {
    /// Fresh value for `key`, removing the entry if it has expired.
    fn fresh(&mut self, key: &str, now: Instant, ttl: Duration) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh(now, ttl) {
            return Some(entry.value.clone());
        }

        tracing::debug!(key = %key, age_ms = entry.age(now).as_millis() as u64, "Evicting stale entry");
        self.entries.remove(key);
        None
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
}

impl Counters {
    fn record_failure(&self, err: &CacheError) {
        match err {
            CacheError::ComputeTimeout => self.timeouts.fetch_add(1, Ordering::Relaxed),
            CacheError::ComputeFailed(_) => self.failures.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// In-memory result cache.
///
/// Entries and in-flight markers share one mutex; it is never held across
/// an await. Memory is bounded only by TTL: distinct keys accumulate until
/// a `get` finds them stale or `reap` sweeps them.
/// Note: Data is lost on process restart.
pub struct InMemoryResultCache<V> {
    state: Mutex<CacheState<V>>,
    ttl: Duration,
    counters: Counters,
}

impl<V> InMemoryResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        if config.ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }

        Ok(Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
            }),
            ttl: config.ttl,
            counters: Counters::default(),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn lead(
        &self,
        key: &str,
        now: Instant,
        compute: ComputeFuture<V>,
        deadline: Option<Instant>,
        tx: watch::Sender<FlightOutcome<V>>,
    ) -> Result<V, CacheError> {
        let guard = LeaderGuard {
            state: &self.state,
            key,
            tx,
            settled: false,
        };

        self.counters.computations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, "Cache miss, computing");

        let outcome = flight::run_until(compute, deadline).await;
        match &outcome {
            Ok(_) => tracing::debug!(key = %key, "Computation stored"),
            Err(err @ CacheError::ComputeTimeout) => {
                self.counters.record_failure(err);
                tracing::warn!(key = %key, "Computation exceeded its deadline");
            }
            Err(err) => {
                self.counters.record_failure(err);
                tracing::error!(key = %key, error = %err, "Computation failed");
            }
        }

        guard.settle(outcome, now)
    }
}

/// What a missing caller does: compute the value, or wait for whoever is.
enum Role<V> {
    Lead(watch::Sender<FlightOutcome<V>>),
    Join(watch::Receiver<FlightOutcome<V>>),
}

/// Owned by the computing caller. Publishes the outcome exactly once, and
/// clears the in-flight marker even if the caller is dropped mid-computation.
struct LeaderGuard<'a, V> {
    state: &'a Mutex<CacheState<V>>,
    key: &'a str,
    tx: watch::Sender<FlightOutcome<V>>,
    settled: bool,
}

impl<V: Clone> LeaderGuard<'_, V> {
    fn settle(mut self, outcome: Result<V, CacheError>, now: Instant) -> Result<V, CacheError> {
        {
            let mut state = self.state.lock();
            if let Ok(value) = &outcome {
                // A `set` made while computing is newer than this result.
                let superseded = state
                    .entries
                    .get(self.key)
                    .is_some_and(|entry| entry.created_at > now);
                if !superseded {
                    state.entries.insert(
                        self.key.to_string(),
                        CacheEntry::new(self.key, value.clone(), now),
                    );
                }
            }
            state.in_flight.remove(self.key);
            self.tx.send_replace(Some(outcome.clone()));
        }

        self.settled = true;
        outcome
    }
}

impl<V> Drop for LeaderGuard<'_, V> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Waiters see the sender close without an outcome once `tx` drops.
        self.state.lock().in_flight.remove(self.key);
        tracing::warn!(key = %self.key, "Computation abandoned by its caller");
    }
}

#[async_trait]
impl<V> ResultCache<V> for InMemoryResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str, now: Instant) -> Lookup<V> {
        let value = self.state.lock().fresh(key, now, self.ttl);
        match value {
            Some(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Hit(value)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss
            }
        }
    }

    fn set(&self, key: &str, value: V, now: Instant) {
        self.state
            .lock()
            .entries
            .insert(key.to_string(), CacheEntry::new(key, value, now));
    }

    fn invalidate(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    async fn get_or_compute(
        &self,
        key: &str,
        now: Instant,
        compute: ComputeFuture<V>,
        deadline: Option<Instant>,
    ) -> Result<V, CacheError> {
        let role = {
            let mut state = self.state.lock();
            if let Some(value) = state.fresh(key, now, self.ttl) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(value);
            }
            self.counters.misses.fetch_add(1, Ordering::Relaxed);

            match state.in_flight.get(key) {
                Some(rx) => Role::Join(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    state.in_flight.insert(key.to_string(), rx);
                    Role::Lead(tx)
                }
            }
        };

        match role {
            Role::Lead(tx) => self.lead(key, now, compute, deadline, tx).await,
            Role::Join(rx) => {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Joining in-flight computation");

                let result = flight::join(rx, deadline).await;
                if matches!(result, Err(CacheError::ComputeTimeout)) {
                    self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                }
                result
            }
        }
    }

    fn stats(&self) -> CacheStats {
        let entries = self.state.lock().entries.len();
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            computations: self.counters.computations.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
            entries,
        }
    }
}

impl<V> Reap for InMemoryResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "result-cache"
    }

    fn reap(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before - state.entries.len()
    }
}

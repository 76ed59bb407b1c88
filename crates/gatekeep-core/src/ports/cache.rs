use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use super::Reap;
use crate::error::{BoxError, CacheError};

/// The expensive operation behind a cache miss.
///
/// Futures are lazy: a caller that joins an in-flight computation has its
/// own future dropped without ever being polled.
pub type ComputeFuture<V> = Pin<Box<dyn Future<Output = Result<V, BoxError>> + Send>>;

/// Result cache trait - time-boxed storage of computed values.
#[async_trait]
pub trait ResultCache<V>: Reap
where
    V: Clone + Send + Sync + 'static,
{
    /// Look up a value. Expired entries are a miss and are removed.
    fn get(&self, key: &str, now: Instant) -> Lookup<V>;

    /// Create or replace an entry, stamped with `now`.
    fn set(&self, key: &str, value: V, now: Instant);

    /// Remove an entry. Returns whether one was present.
    fn invalidate(&self, key: &str) -> bool;

    /// Return the cached value, or run `compute` once for all concurrent
    /// callers of the same key and store its result.
    ///
    /// `deadline` bounds the computation (or the wait for someone else's).
    async fn get_or_compute(
        &self,
        key: &str,
        now: Instant,
        compute: ComputeFuture<V>,
        deadline: Option<Instant>,
    ) -> Result<V, CacheError>;

    /// Snapshot of the cache's counters.
    fn stats(&self) -> CacheStats;
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Hit(V),
    Miss,
}

impl<V> Lookup<V> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn into_option(self) -> Option<V> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss => None,
        }
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Computations actually started.
    pub computations: u64,
    /// Callers that joined an in-flight computation instead of starting one.
    pub coalesced: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub entries: usize,
}

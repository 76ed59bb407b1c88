use std::time::{Duration, Instant};

/// A cached value stamped with the instant it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub created_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(key: impl Into<String>, value: V, created_at: Instant) -> Self {
        Self {
            key: key.into(),
            value,
            created_at,
        }
    }

    /// Age of the entry at `now`. Zero if `now` precedes `created_at`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// An entry is valid while its age does not exceed `ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) <= ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_boundary() {
        let t0 = Instant::now();
        let ttl = Duration::from_secs(5);
        let entry = CacheEntry::new("metrics_day", 42, t0);

        assert!(entry.is_fresh(t0 + Duration::from_secs(4), ttl));
        assert!(entry.is_fresh(t0 + ttl, ttl));
        assert!(!entry.is_fresh(t0 + Duration::from_secs(6), ttl));
    }

    #[test]
    fn test_age_before_creation_is_zero() {
        let t0 = Instant::now();
        let entry = CacheEntry::new("k", (), t0 + Duration::from_secs(3));
        assert_eq!(entry.age(t0), Duration::ZERO);
    }
}

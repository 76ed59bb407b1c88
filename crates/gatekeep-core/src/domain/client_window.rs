use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::ports::Admission;

/// Sliding window of recent admissions for one client identity.
///
/// Timestamps are kept in arrival order. An out-of-order `now` is clamped
/// to the last recorded instant so the sequence stays non-decreasing.
#[derive(Debug, Clone)]
pub struct ClientWindow {
    identity: String,
    timestamps: VecDeque<Instant>,
}

impl ClientWindow {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            timestamps: VecDeque::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Drop every timestamp strictly older than `now - window`.
    /// Returns how many were removed.
    pub fn prune(&mut self, now: Instant, window: Duration) -> usize {
        let Some(cutoff) = now.checked_sub(window) else {
            return 0;
        };

        let before = self.timestamps.len();
        while self.timestamps.front().is_some_and(|ts| *ts < cutoff) {
            self.timestamps.pop_front();
        }
        before - self.timestamps.len()
    }

    /// Prune, then record `now` if the window still has room.
    ///
    /// A rejected attempt is not recorded. A zero-length window allows at
    /// most one request per instant.
    pub fn try_admit(&mut self, now: Instant, max_requests: u32, window: Duration) -> Admission {
        self.prune(now, window);

        let limit = if window.is_zero() {
            max_requests.min(1)
        } else {
            max_requests
        };

        let count = self.timestamps.len();
        if count >= limit as usize {
            return Admission::Rejected {
                retry_after: self.retry_after(now, window, limit),
            };
        }

        let at = self.timestamps.back().map_or(now, |last| (*last).max(now));
        self.timestamps.push_back(at);

        Admission::Admitted {
            remaining: limit.saturating_sub(self.timestamps.len() as u32),
        }
    }

    /// Time until the oldest retained timestamp reaches the edge of the window.
    fn retry_after(&self, now: Instant, window: Duration, limit: u32) -> Duration {
        if limit == 0 {
            return window;
        }

        self.timestamps
            .front()
            .and_then(|oldest| oldest.checked_add(window))
            .map(|expires| expires.saturating_duration_since(now))
            .unwrap_or(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_sliding_window_bound() {
        let t0 = Instant::now();
        let mut window = ClientWindow::new("10.0.0.1");

        assert!(window.try_admit(t0, 3, secs(10)).is_admitted());
        assert!(window.try_admit(t0 + secs(1), 3, secs(10)).is_admitted());
        assert_eq!(
            window.try_admit(t0 + secs(2), 3, secs(10)),
            Admission::Admitted { remaining: 0 }
        );
        assert!(!window.try_admit(t0 + secs(3), 3, secs(10)).is_admitted());
        assert!(window.try_admit(t0 + secs(11), 3, secs(10)).is_admitted());
    }

    #[test]
    fn test_rejection_is_not_recorded() {
        let t0 = Instant::now();
        let mut window = ClientWindow::new("client");

        assert!(window.try_admit(t0, 1, secs(10)).is_admitted());
        for offset in 1..5 {
            assert!(!window.try_admit(t0 + secs(offset), 1, secs(10)).is_admitted());
        }
        assert_eq!(window.len(), 1);

        // Only the admitted request at t0 counts, so t0 + 11s is free again.
        assert!(window.try_admit(t0 + secs(11), 1, secs(10)).is_admitted());
    }

    #[test]
    fn test_timestamp_on_window_edge_is_retained() {
        let t0 = Instant::now();
        let mut window = ClientWindow::new("client");

        window.try_admit(t0, 1, secs(10));
        assert!(!window.try_admit(t0 + secs(10), 1, secs(10)).is_admitted());
        assert_eq!(window.prune(t0 + secs(10), secs(10)), 0);
        assert_eq!(window.prune(t0 + secs(10) + Duration::from_millis(1), secs(10)), 1);
        assert!(window.is_empty());
    }

    #[test]
    fn test_zero_max_requests_rejects() {
        let t0 = Instant::now();
        let mut window = ClientWindow::new("client");

        assert_eq!(
            window.try_admit(t0, 0, secs(10)),
            Admission::Rejected { retry_after: secs(10) }
        );
        assert!(window.is_empty());
    }

    #[test]
    fn test_zero_window_allows_one_per_instant() {
        let t0 = Instant::now();
        let mut window = ClientWindow::new("client");

        assert!(window.try_admit(t0, 5, Duration::ZERO).is_admitted());
        assert!(!window.try_admit(t0, 5, Duration::ZERO).is_admitted());
        assert!(
            window
                .try_admit(t0 + Duration::from_nanos(1), 5, Duration::ZERO)
                .is_admitted()
        );
    }

    #[test]
    fn test_retry_after_tracks_oldest_timestamp() {
        let t0 = Instant::now();
        let mut window = ClientWindow::new("client");

        window.try_admit(t0, 2, secs(10));
        window.try_admit(t0 + secs(4), 2, secs(10));

        assert_eq!(
            window.try_admit(t0 + secs(6), 2, secs(10)),
            Admission::Rejected { retry_after: secs(4) }
        );
    }

    #[test]
    fn test_out_of_order_instant_is_clamped() {
        let t0 = Instant::now();
        let mut window = ClientWindow::new("client");

        window.try_admit(t0 + secs(5), 10, secs(60));
        window.try_admit(t0 + secs(2), 10, secs(60));

        assert_eq!(window.len(), 2);
        // Both entries share t0 + 5s, so both leave the window together.
        assert_eq!(window.prune(t0 + secs(66), secs(60)), 2);
    }
}

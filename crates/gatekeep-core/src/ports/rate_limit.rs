//! Admission control port.

use std::time::{Duration, Instant};

use super::Reap;

/// Admission controller - decides whether a client's request may proceed.
///
/// Implementations must never block on I/O; `check` is called inline on
/// the request path.
pub trait AdmissionControl: Reap {
    /// Decide on a request from `identity` arriving at `now`.
    /// Only admitted requests count against later checks.
    fn check(&self, identity: &str, now: Instant) -> Admission;

    /// Snapshot of the controller's counters.
    fn stats(&self) -> AdmissionStats;
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed. `remaining` admissions are left in the window.
    Admitted { remaining: u32 },
    /// Too many requests. The window frees up after `retry_after`.
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Admission counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionStats {
    pub admitted: u64,
    pub rejected: u64,
    pub tracked_identities: usize,
}

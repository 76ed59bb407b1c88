//! Single-flight plumbing: the value published by the computing caller and
//! the helpers both sides of a flight use.

use std::time::Instant;

use tokio::sync::watch;

use gatekeep_core::CacheError;
use gatekeep_core::ports::ComputeFuture;

/// `None` while the computation runs, then the shared outcome.
pub(super) type FlightOutcome<V> = Option<Result<V, CacheError>>;

pub(super) const ABANDONED: &str = "computation abandoned";

/// Run the computation, bounded by `deadline` when one is given.
pub(super) async fn run_until<V>(
    compute: ComputeFuture<V>,
    deadline: Option<Instant>,
) -> Result<V, CacheError> {
    let result = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline.into(), compute)
            .await
            .map_err(|_| CacheError::ComputeTimeout)?,
        None => compute.await,
    };

    result.map_err(|e| CacheError::ComputeFailed(e.to_string()))
}

/// Wait for the computing caller to publish its outcome.
///
/// A closed channel with no outcome means the computing caller was dropped.
pub(super) async fn join<V: Clone>(
    mut rx: watch::Receiver<FlightOutcome<V>>,
    deadline: Option<Instant>,
) -> Result<V, CacheError> {
    let settled = match deadline {
        Some(deadline) => {
            match tokio::time::timeout_at(deadline.into(), rx.wait_for(|o| o.is_some())).await {
                Ok(Ok(outcome)) => outcome.clone(),
                Ok(Err(_)) => None,
                Err(_) => return Err(CacheError::ComputeTimeout),
            }
        }
        None => match rx.wait_for(|o| o.is_some()).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        },
    };

    settled.unwrap_or_else(|| Err(CacheError::ComputeFailed(ABANDONED.to_string())))
}

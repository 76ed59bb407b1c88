//! Domain-level error types.

use thiserror::Error;

/// Boxed error returned by a cache computation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result cache failures surfaced by `get_or_compute`.
///
/// `Clone` so that a single outcome can be handed to every waiter of a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Computation failed: {0}")]
    ComputeFailed(String),

    #[error("Computation deadline exceeded")]
    ComputeTimeout,
}

/// Construction-time configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cache TTL must be greater than zero")]
    ZeroTtl,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

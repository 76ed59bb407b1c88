//! Admission control implementations.

mod memory;

pub use memory::{InMemoryRateLimiter, RateLimitConfig};

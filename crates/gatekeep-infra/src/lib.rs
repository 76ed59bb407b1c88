//! # Gatekeep Infrastructure
//!
//! In-memory implementations of the ports defined in `gatekeep-core`:
//! a sliding-window admission controller, a TTL result cache with
//! single-flight recomputation, and identity policies.
//!
//! All state is process-local. Running several replicas multiplies the
//! effective rate limit by the replica count and gives each replica its
//! own cache.

pub mod cache;
pub mod env;
pub mod identity;
pub mod rate_limit;

pub use cache::{CacheConfig, InMemoryResultCache};
pub use identity::{IdentityPolicyKind, PeerAddressIdentity, PrincipalIdentity};
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};

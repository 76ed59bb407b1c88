//! Ports - trait definitions implemented by the infrastructure layer.

mod cache;
mod identity;
mod rate_limit;
mod reap;

pub use cache::{CacheStats, ComputeFuture, Lookup, ResultCache};
pub use identity::{IdentityPolicy, RequestIdentity};
pub use rate_limit::{Admission, AdmissionControl, AdmissionStats};
pub use reap::Reap;

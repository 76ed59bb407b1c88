//! Result cache implementations.

mod flight;
mod memory;

pub use memory::{CacheConfig, InMemoryResultCache};

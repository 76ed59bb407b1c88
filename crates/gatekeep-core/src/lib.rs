//! # Gatekeep Core
//!
//! Admission control and result caching, expressed as ports and the pure
//! records behind them. Concrete in-memory implementations live in
//! `gatekeep-infra`.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::{BoxError, CacheError, ConfigError};

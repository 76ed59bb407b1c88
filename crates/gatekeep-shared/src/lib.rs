//! # Gatekeep Shared
//!
//! Wire types returned by the reference API host.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;

//! Domain records - the state kept per identity and per cache key.

mod cache_entry;
mod client_window;

pub use cache_entry::CacheEntry;
pub use client_window::ClientWindow;

//! Cache Module
//!
//! Provides in-memory response caching with TTL expiration and FIFO eviction.

mod entry;
mod order;
mod policy;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use order::InsertionOrder;
pub use policy::{CachePolicy, DEFAULT_EXCLUDED_PATHS};
pub use stats::CacheStats;
pub use store::CacheStore;

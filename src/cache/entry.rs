//! Cache Entry Module
//!
//! Defines the structure for individual cached responses.

use std::time::Duration;

use tokio::time::Instant;

use crate::models::ApiResponse;

// == Cache Entry ==
/// A cached response with the instant it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored response
    pub payload: ApiResponse,
    /// When the response was stored
    pub stored_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current instant.
    pub fn new(payload: ApiResponse) -> Self {
        Self {
            payload,
            stored_at: Instant::now(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl`.
    ///
    /// An entry is valid only while `now - stored_at < ttl`, so it is expired
    /// from the instant the full TTL has elapsed.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }

    // == Age ==
    /// Time elapsed since the entry was stored.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.stored_at)
    }

    // == Time To Live ==
    /// Remaining lifetime under `ttl`, zero once expired.
    pub fn ttl_remaining(&self, ttl: Duration) -> Duration {
        ttl.saturating_sub(self.age())
    }
}

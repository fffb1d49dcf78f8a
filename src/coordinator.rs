//! Request Coordinator
//!
//! Single-flight execution: concurrent requests sharing a fingerprint are
//! collapsed onto one network call, and every caller receives that call's outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{oneshot, Mutex};
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::models::ApiResponse;

type Waiter = oneshot::Sender<Result<ApiResponse>>;

// == Flight ==
/// Role handed to a caller by [`RequestCoordinator::begin_or_join`].
#[derive(Debug)]
pub enum Flight {
    /// First caller for the key: must execute the request and settle it
    Owner,
    /// A call is already in flight: await its outcome instead
    Joined(FlightHandle),
}

impl Flight {
    pub fn is_owner(&self) -> bool {
        matches!(self, Flight::Owner)
    }
}

/// Awaitable outcome of somebody else's in-flight request.
#[derive(Debug)]
pub struct FlightHandle {
    receiver: oneshot::Receiver<Result<ApiResponse>>,
}

impl FlightHandle {
    /// Waits for the owner to settle.
    pub async fn wait(self) -> Result<ApiResponse> {
        self.receiver.await.unwrap_or_else(|_| {
            Err(ApiError::Internal(
                "in-flight request was dropped before settling".to_string(),
            ))
        })
    }
}

// == Request Coordinator ==
/// In-flight map: at most one entry per fingerprint, holding its waiters in
/// arrival order.
#[derive(Debug, Default)]
pub struct RequestCoordinator {
    in_flight: Mutex<HashMap<String, Vec<Waiter>>>,
    joined: AtomicU64,
}

impl RequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    // == Begin Or Join ==
    /// Claims `key` for the caller, or registers the caller as a waiter on the
    /// call already in flight.
    ///
    /// The lookup and the insert happen under one lock, so two racing callers
    /// can never both become owner.
    pub async fn begin_or_join(&self, key: &str) -> Flight {
        let mut in_flight = self.in_flight.lock().await;

        match in_flight.get_mut(key) {
            Some(waiters) => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                self.joined.fetch_add(1, Ordering::Relaxed);
                debug!(key, waiters = waiters.len(), "joined in-flight request");
                Flight::Joined(FlightHandle { receiver: rx })
            }
            None => {
                in_flight.insert(key.to_string(), Vec::new());
                Flight::Owner
            }
        }
    }

    // == Settle ==
    /// Removes the entry for `key` and releases its waiters, first arrived
    /// first released, each with a copy of `outcome`.
    ///
    /// Returns the number of waiters released.
    pub async fn settle(&self, key: &str, outcome: &Result<ApiResponse>) -> usize {
        let waiters = self.in_flight.lock().await.remove(key).unwrap_or_default();
        let released = waiters.len();

        for waiter in waiters {
            // A waiter that gave up has dropped its receiver; nothing to do.
            let _ = waiter.send(outcome.clone());
        }

        if released > 0 {
            debug!(key, released, "released joined callers");
        }
        released
    }

    /// Number of fingerprints currently in flight.
    #[cfg(test)]
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    pub async fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().await.contains_key(key)
    }

    /// Total number of callers that were collapsed onto another call.
    pub fn joined_count(&self) -> u64 {
        self.joined.load(Ordering::Relaxed)
    }
}

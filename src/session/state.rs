//! Refresh state
//!
//! The single-refresh gate shared by proactive and reactive renewals.

use std::collections::VecDeque;

use tokio::sync::oneshot;

/// Result of a refresh attempt, as seen by everyone who waited on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Renewed,
    Failed,
}

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOrigin {
    /// The proactive timer fired
    Scheduled,
    /// A request came back with an expired session
    Reactive,
}

/// What the caller of [`RefreshState::claim`] must do next.
#[derive(Debug)]
pub enum Claim {
    /// Nobody is refreshing: the caller issues the refresh call
    Refresher,
    /// A refresh is outstanding: wait for its outcome
    Queued(oneshot::Receiver<RefreshOutcome>),
    /// The session was lost; no refresh until it is started again
    Invalidated,
}

/// Settled refresh: who waited and whether a reactive caller was involved.
#[derive(Debug)]
pub struct Drained {
    pub waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
    pub reactive: bool,
}

#[derive(Debug, Default)]
pub struct RefreshState {
    in_progress: bool,
    queue: VecDeque<oneshot::Sender<RefreshOutcome>>,
    reactive: bool,
    invalidated: bool,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-set of `in_progress`, or enqueue behind the outstanding
    /// refresh. Callers hold the state lock across this call.
    pub fn claim(&mut self, origin: RefreshOrigin) -> Claim {
        if self.invalidated {
            return Claim::Invalidated;
        }

        if origin == RefreshOrigin::Reactive {
            self.reactive = true;
        }

        if self.in_progress {
            let (tx, rx) = oneshot::channel();
            self.queue.push_back(tx);
            Claim::Queued(rx)
        } else {
            self.in_progress = true;
            Claim::Refresher
        }
    }

    /// Ends the current refresh and hands back its waiters in arrival order.
    ///
    /// A failure with a reactive participant closes the gate in the same
    /// step, so a late expiry cannot claim a second refresh.
    pub fn drain(&mut self, outcome: RefreshOutcome) -> Drained {
        self.in_progress = false;
        let reactive = std::mem::take(&mut self.reactive);
        if outcome == RefreshOutcome::Failed && reactive {
            self.invalidated = true;
        }
        Drained {
            waiters: std::mem::take(&mut self.queue),
            reactive,
        }
    }

    /// Reopens the gate for a new session.
    pub fn reopen(&mut self) {
        self.invalidated = false;
    }

    /// Back to Idle: pending waiters are dropped and the gate is open.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

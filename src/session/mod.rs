//! Session Module
//!
//! Access-token lifecycle: the single-refresh gate, proactive and reactive
//! renewal, and the collaborators notified when credentials rotate or the
//! session is lost.

pub mod hooks;
mod manager;
mod state;

pub use hooks::{LogRedirect, LoginRedirect, LoginTarget, NoRealtime, RealtimeBridge};
pub use manager::{SessionRefreshManager, SessionSettings};
pub use state::{RefreshOrigin, RefreshOutcome, RefreshState};

#[cfg(test)]
pub(crate) use manager::tests::{CountingRealtime, RecordingRedirect};

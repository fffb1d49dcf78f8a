//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a session is active.
//!
//! # Tasks
//! - Proactive refresh: renews the session credential before it expires

mod refresh;

pub use refresh::spawn_refresh_task;

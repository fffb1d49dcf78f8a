//! Dashboard Client - resilient network layer for the admin dashboard
//!
//! Sits between UI code and the backend HTTP API and provides response caching,
//! collapsing of duplicate in-flight requests, CSRF token handling and
//! transparent session refresh.

pub mod cache;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod csrf;
pub mod error;
pub mod models;
pub mod session;
pub mod tasks;
pub mod transport;

pub use client::{ApiClient, ApiClientBuilder};
pub use config::Config;
pub use error::{ApiError, Result};
pub use models::{ApiRequest, ApiResponse, Method};
pub use session::{LoginRedirect, RealtimeBridge};
pub use transport::{HttpTransport, Transport};

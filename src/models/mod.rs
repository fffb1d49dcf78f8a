//! Request and Response models for the API client
//!
//! This module defines the values that flow through the pipeline.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{normalize_path, ApiRequest, Method};
pub use responses::ApiResponse;

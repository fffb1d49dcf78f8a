//! CSRF Guard
//!
//! Holds the anti-forgery token, attaches it to mutating requests, picks up
//! rotated tokens from response bodies and recovers once from a rejection.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{ApiRequest, ApiResponse};
use crate::transport::Transport;

// == Csrf Guard ==
#[derive(Debug)]
pub struct CsrfGuard {
    token: RwLock<Option<String>>,
    header: String,
    body_field: String,
    error_code: String,
    endpoint: String,
    fetches: AtomicU64,
}

impl CsrfGuard {
    pub fn new(
        header: impl Into<String>,
        body_field: impl Into<String>,
        error_code: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            token: RwLock::new(None),
            header: header.into(),
            body_field: body_field.into(),
            error_code: error_code.into(),
            endpoint: endpoint.into(),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.csrf_header,
            &config.csrf_body_field,
            &config.csrf_error_code,
            &config.csrf_path,
        )
    }

    // == Attach ==
    /// Sets the current token as a header on mutating requests.
    ///
    /// Without a token the request goes out unguarded and the server decides.
    pub async fn attach(&self, request: &mut ApiRequest) {
        if !request.method.is_mutating() {
            return;
        }
        if let Some(token) = self.token.read().await.as_ref() {
            request.headers.insert(self.header.clone(), token.clone());
        }
    }

    // == Harvest ==
    /// Replaces the stored token whenever a response body carries one.
    ///
    /// Returns true if a token was found.
    pub async fn harvest(&self, response: &ApiResponse) -> bool {
        match response.body_str(&self.body_field) {
            Some(token) => {
                *self.token.write().await = Some(token.to_string());
                debug!("csrf token rotated from response body");
                true
            }
            None => false,
        }
    }

    /// Returns true when `err` is the server's CSRF rejection.
    pub fn is_rejection(&self, err: &ApiError) -> bool {
        err.code() == Some(self.error_code.as_str())
    }

    // == Fetch Fresh ==
    /// Requests a new token from the dedicated endpoint and stores it.
    pub async fn fetch_fresh(&self, transport: &dyn Transport) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let response = transport.execute(&ApiRequest::get(self.endpoint.as_str())).await?;

        match response.body_str(&self.body_field) {
            Some(token) => {
                let token = token.to_string();
                *self.token.write().await = Some(token.clone());
                info!("fetched fresh csrf token");
                Ok(token)
            }
            None => Err(ApiError::Decode(format!(
                "csrf endpoint response has no `{}` field",
                self.body_field
            ))),
        }
    }

    // == Recover From ==
    /// Prepares `request` for its single CSRF retry.
    ///
    /// Returns true when `err` is a CSRF rejection, the request has not been
    /// retried for this reason yet and a fresh token was obtained; the request
    /// is then marked and carries the new token. A failed token fetch leaves
    /// the original error to be surfaced.
    pub async fn recover_from(
        &self,
        err: &ApiError,
        request: &mut ApiRequest,
        transport: &dyn Transport,
    ) -> bool {
        if !self.is_rejection(err) || request.csrf_retried {
            return false;
        }

        match self.fetch_fresh(transport).await {
            Ok(_) => {
                request.csrf_retried = true;
                self.attach(request).await;
                true
            }
            Err(fetch_err) => {
                warn!(error = %fetch_err, "could not fetch fresh csrf token");
                false
            }
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Number of calls made to the token endpoint.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

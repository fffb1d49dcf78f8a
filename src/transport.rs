//! Transport Module
//!
//! The seam between the pipeline and the network: a `Transport` trait, the
//! reqwest-backed `HttpTransport`, and the `Exchange` that wraps every call
//! with CSRF attach and harvest.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::csrf::CsrfGuard;
use crate::error::{ApiError, Result};
use crate::models::{ApiRequest, ApiResponse, Method};

// == Transport Trait ==
/// Executes one request against the backend.
///
/// Implementations return `Err(ApiError::Status { .. })` for non-success
/// statuses so the pipeline can classify them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

// == Http Transport ==
/// reqwest-backed transport. The cookie store carries the session credential,
/// so a successful refresh call rotates it transparently.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("could not build http client: {}", e)))?;
        Self::with_client(client, base_url)
    }

    /// Uses a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("invalid path `{}`: {}", path, e)))
    }
}

/// Parses the base URL, forcing a trailing slash so relative paths are joined
/// below it instead of replacing its last segment.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };
    Url::parse(&normalized)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid base url `{}`: {}", base_url, e)))
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request.path)?;
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url)
            .query(&request.query);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        debug!(method = %request.method, path = %request.path, status, "request settled");

        if (200..300).contains(&status) {
            Ok(ApiResponse {
                status,
                headers,
                body,
            })
        } else {
            Err(ApiError::from_status(status, body))
        }
    }
}

// == Exchange ==
/// One guarded round trip: attach the CSRF token, execute, harvest any
/// rotated token from the response.
pub struct Exchange {
    transport: Arc<dyn Transport>,
    csrf: Arc<CsrfGuard>,
}

impl Exchange {
    pub fn new(transport: Arc<dyn Transport>, csrf: Arc<CsrfGuard>) -> Self {
        Self { transport, csrf }
    }

    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut outgoing = request.clone();
        self.csrf.attach(&mut outgoing).await;

        let response = self.transport.execute(&outgoing).await?;
        self.csrf.harvest(&response).await;
        Ok(response)
    }

    /// Runs the CSRF recovery for a failed request; true means retry it.
    pub async fn recover_csrf(&self, err: &ApiError, request: &mut ApiRequest) -> bool {
        self.csrf
            .recover_from(err, request, self.transport.as_ref())
            .await
    }

    pub async fn fetch_csrf(&self) -> Result<String> {
        self.csrf.fetch_fresh(self.transport.as_ref()).await
    }

    pub fn csrf(&self) -> &CsrfGuard {
        &self.csrf
    }
}

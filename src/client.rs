//! API Client
//!
//! The request pipeline wired around every call: cache short-circuit,
//! single-flight coalescing, CSRF attach/harvest/recovery and session
//! refresh on expiry.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CachePolicy, CacheStats, CacheStore};
use crate::config::Config;
use crate::coordinator::{Flight, RequestCoordinator};
use crate::csrf::CsrfGuard;
use crate::error::{ApiError, Result};
use crate::models::{ApiRequest, ApiResponse};
use crate::session::{
    LogRedirect, LoginRedirect, LoginTarget, NoRealtime, RealtimeBridge, RefreshOrigin,
    RefreshOutcome, SessionRefreshManager, SessionSettings,
};
use crate::transport::{Exchange, HttpTransport, Transport};

// == Api Client ==
/// Handle to the client pipeline. Cloning is cheap and shares all state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    cache: Arc<RwLock<CacheStore>>,
    policy: CachePolicy,
    coordinator: RequestCoordinator,
    exchange: Arc<Exchange>,
    session: Arc<SessionRefreshManager>,
}

impl ApiClient {
    /// Starts building a client from `config`.
    pub fn builder(config: Config) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            transport: None,
            realtime: None,
            redirect: None,
        }
    }

    /// Creates a client talking HTTP to `config.base_url`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder(config.clone()).build()
    }

    // == Send ==
    /// Sends `request` through the pipeline.
    ///
    /// A live cached response is returned without touching the network or the
    /// coordinator. Otherwise the caller either owns the call or joins the
    /// identical call already in flight and receives its outcome.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let key = request.fingerprint();
        let cacheable = self.inner.policy.is_cacheable(&request);

        if cacheable {
            if let Some(hit) = self.inner.cache.write().await.lookup(&key) {
                debug!(%key, "served from cache");
                return Ok(hit);
            }
        }

        let flight = self.inner.coordinator.begin_or_join(&key).await;
        match flight {
            Flight::Joined(handle) => handle.wait().await,
            Flight::Owner => {
                // A flight for this key may have settled between the cache miss
                // and the claim; serve what it stored rather than calling again.
                if cacheable {
                    let hit = self.inner.cache.write().await.lookup(&key);
                    if let Some(hit) = hit {
                        let outcome = Ok(hit);
                        self.inner.coordinator.settle(&key, &outcome).await;
                        return outcome;
                    }
                }

                // The exchange runs detached so that an abandoned caller still
                // settles the flight for everyone who joined it.
                let inner = Arc::clone(&self.inner);
                let task = tokio::spawn(async move {
                    let mut guard = SettleGuard::new(Arc::clone(&inner), key.clone());
                    let outcome = inner.execute_owned(key, request, cacheable).await;
                    guard.disarm();
                    outcome
                });

                task.await.unwrap_or_else(|join_err| {
                    Err(ApiError::Internal(format!("request task failed: {}", join_err)))
                })
            }
        }
    }

    // == Convenience ==
    pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post(&self, path: impl Into<String>, body: Value) -> Result<ApiResponse> {
        self.send(ApiRequest::post(path).json(body)).await
    }

    pub async fn put(&self, path: impl Into<String>, body: Value) -> Result<ApiResponse> {
        self.send(ApiRequest::put(path).json(body)).await
    }

    pub async fn patch(&self, path: impl Into<String>, body: Value) -> Result<ApiResponse> {
        self.send(ApiRequest::patch(path).json(body)).await
    }

    pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }

    // == Session Lifecycle ==
    /// Starts the proactive refresh timer and lifts a previous invalidation.
    /// Call after login.
    pub async fn start_session(&self) {
        self.inner.session.start().await;
    }

    /// Ends the session: stops the timer, empties the cache, forgets the CSRF
    /// token and returns the refresh gate to Idle.
    pub async fn end_session(&self) {
        self.inner.session.reset().await;
        self.inner.cache.write().await.clear();
        self.inner.exchange.csrf().clear().await;
        debug!("session ended");
    }

    /// Fetches a CSRF token ahead of the first mutation.
    pub async fn prime_csrf(&self) -> Result<String> {
        self.inner.exchange.fetch_csrf().await
    }

    /// Records where the user currently is, used as the login return path.
    pub async fn set_location(&self, path: impl Into<String>) {
        self.inner.session.set_location(path).await;
    }

    // == Introspection ==
    pub async fn cache_stats(&self) -> CacheStats {
        self.inner.cache.read().await.stats()
    }

    /// Callers served by joining another caller's request.
    pub fn coalesced_count(&self) -> u64 {
        self.inner.coordinator.joined_count()
    }

    pub fn session(&self) -> &SessionRefreshManager {
        &self.inner.session
    }

    pub fn csrf(&self) -> &CsrfGuard {
        self.inner.exchange.csrf()
    }
}

impl ClientInner {
    /// Runs the owner's exchange, writes an eligible success through to the
    /// cache, then settles the flight. The cache write happens first so that a
    /// caller arriving after settlement finds the value instead of starting a
    /// new call.
    async fn execute_owned(
        &self,
        key: String,
        request: ApiRequest,
        cacheable: bool,
    ) -> Result<ApiResponse> {
        let outcome = self.dispatch(request).await;

        if cacheable {
            if let Ok(response) = &outcome {
                self.cache.write().await.store(key.clone(), response.clone());
            }
        }

        self.coordinator.settle(&key, &outcome).await;
        outcome
    }

    // == Dispatch ==
    /// Executes with recovery: at most one CSRF retry and at most one retry
    /// after a session refresh per request. Any other error is returned as is.
    async fn dispatch(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        loop {
            let err = match self.exchange.send(&request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if self.exchange.recover_csrf(&err, &mut request).await {
                debug!(path = %request.path, "retrying after csrf token refresh");
                continue;
            }

            if self.session.should_recover(&err, &request) {
                match self.session.renew(RefreshOrigin::Reactive).await {
                    RefreshOutcome::Renewed => {
                        request.auth_retried = true;
                        debug!(path = %request.path, "retrying after session refresh");
                        continue;
                    }
                    RefreshOutcome::Failed => return Err(err),
                }
            }

            return Err(err);
        }
    }
}

// == Settle Guard ==
/// Releases a flight's joiners with an internal error when the owning task
/// unwinds before settling it, so the key never stays in flight.
struct SettleGuard {
    inner: Arc<ClientInner>,
    key: Option<String>,
}

impl SettleGuard {
    fn new(inner: Arc<ClientInner>, key: String) -> Self {
        Self {
            inner,
            key: Some(key),
        }
    }

    fn disarm(&mut self) {
        self.key = None;
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        warn!(%key, "request task ended without settling; releasing joiners");

        let inner = Arc::clone(&self.inner);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                let err = ApiError::Internal("request task ended before settling".to_string());
                inner.coordinator.settle(&key, &Err(err)).await;
            });
        }
    }
}

// == Builder ==
/// Wires collaborators into an [`ApiClient`].
pub struct ApiClientBuilder {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
    realtime: Option<Arc<dyn RealtimeBridge>>,
    redirect: Option<Arc<dyn LoginRedirect>>,
}

impl ApiClientBuilder {
    /// Replaces the default HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn realtime(mut self, realtime: Arc<dyn RealtimeBridge>) -> Self {
        self.realtime = Some(realtime);
        self
    }

    pub fn login_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let config = self.config;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config.base_url)?),
        };
        let login = LoginTarget::new(&config.base_url, &config.login_url, &config.return_param)?;

        let cache = Arc::new(RwLock::new(CacheStore::new(
            config.cache_max_entries,
            config.cache_ttl(),
        )));
        let csrf = Arc::new(CsrfGuard::from_config(&config));
        let exchange = Arc::new(Exchange::new(transport, csrf));

        let session = Arc::new(SessionRefreshManager::new(
            exchange.clone(),
            cache.clone(),
            SessionSettings {
                refresh_path: config.refresh_path.clone(),
                auth_expired_status: config.auth_expired_status,
                interval: config.refresh_interval(),
                login,
            },
            self.realtime.unwrap_or_else(|| Arc::new(NoRealtime)),
            self.redirect.unwrap_or_else(|| Arc::new(LogRedirect)),
        ));

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                cache,
                policy: CachePolicy::new(&config.cache_exclusions),
                coordinator: RequestCoordinator::new(),
                exchange,
                session,
            }),
        })
    }
}

//! Session Refresh Manager
//!
//! Owns the access-token lifecycle: scheduled renewal, renewal on expired
//! sessions, the queue of callers waiting on an outstanding refresh, and the
//! teardown when renewal fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::error::ApiError;
use crate::models::ApiRequest;
use crate::session::hooks::{LoginRedirect, LoginTarget, RealtimeBridge};
use crate::session::state::{Claim, RefreshOrigin, RefreshOutcome, RefreshState};
use crate::tasks::spawn_refresh_task;
use crate::transport::Exchange;

pub struct SessionRefreshManager {
    exchange: Arc<Exchange>,
    /// Cleared together with the session
    cache: Arc<RwLock<CacheStore>>,
    refresh_path: String,
    auth_expired_status: u16,
    interval: Duration,
    state: Mutex<RefreshState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    realtime: Arc<dyn RealtimeBridge>,
    redirect: Arc<dyn LoginRedirect>,
    login: LoginTarget,
    /// Return path appended to the login redirect
    location: RwLock<String>,
    last_renewed_at: RwLock<Option<DateTime<Utc>>>,
    refresh_calls: AtomicU64,
    redirects: AtomicU64,
}

/// Construction parameters for [`SessionRefreshManager`].
pub struct SessionSettings {
    pub refresh_path: String,
    pub auth_expired_status: u16,
    pub interval: Duration,
    pub login: LoginTarget,
}

impl SessionRefreshManager {
    pub fn new(
        exchange: Arc<Exchange>,
        cache: Arc<RwLock<CacheStore>>,
        settings: SessionSettings,
        realtime: Arc<dyn RealtimeBridge>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Self {
        Self {
            exchange,
            cache,
            refresh_path: settings.refresh_path,
            auth_expired_status: settings.auth_expired_status,
            interval: settings.interval,
            state: Mutex::new(RefreshState::new()),
            timer: Mutex::new(None),
            realtime,
            redirect,
            login: settings.login,
            location: RwLock::new("/".to_string()),
            last_renewed_at: RwLock::new(None),
            refresh_calls: AtomicU64::new(0),
            redirects: AtomicU64::new(0),
        }
    }

    // == Classification ==
    /// True when `err` should trigger a reactive refresh for `request`: an
    /// expired-session status on a request that is neither the refresh call
    /// itself nor already retried after one.
    pub fn should_recover(&self, err: &ApiError, request: &ApiRequest) -> bool {
        err.status() == Some(self.auth_expired_status) && !request.auth_retried && !request.is_refresh
    }

    // == Renew ==
    /// Renews the session, or waits on the renewal already in progress.
    ///
    /// Only the caller that wins the claim issues the refresh call; everyone
    /// arriving meanwhile is queued and released, in arrival order, with the
    /// same outcome.
    pub async fn renew(&self, origin: RefreshOrigin) -> RefreshOutcome {
        let claim = self.state.lock().await.claim(origin);

        match claim {
            Claim::Refresher => {}
            Claim::Queued(waiter) => {
                debug!(?origin, "refresh already in progress; queued");
                // The refresher went away (session ended) without settling.
                return waiter.await.unwrap_or(RefreshOutcome::Failed);
            }
            Claim::Invalidated => {
                debug!(?origin, "session invalidated; refresh skipped");
                return RefreshOutcome::Failed;
            }
        }

        let outcome = self.perform_refresh(origin).await;
        let drained = self.state.lock().await.drain(outcome);

        match outcome {
            RefreshOutcome::Renewed => {
                *self.last_renewed_at.write().await = Some(Utc::now());
                self.realtime.reconnect();
            }
            RefreshOutcome::Failed if drained.reactive => self.invalidate().await,
            RefreshOutcome::Failed => {}
        }

        let released = drained.waiters.len();
        for waiter in drained.waiters {
            let _ = waiter.send(outcome);
        }
        if released > 0 {
            debug!(released, ?outcome, "released queued callers");
        }

        outcome
    }

    async fn perform_refresh(&self, origin: RefreshOrigin) -> RefreshOutcome {
        self.refresh_calls.fetch_add(1, Ordering::Relaxed);
        let request = ApiRequest::post(self.refresh_path.as_str()).refresh_call();

        match self.exchange.send(&request).await {
            Ok(_) => {
                info!(?origin, "session refreshed");
                RefreshOutcome::Renewed
            }
            Err(err) => {
                warn!(?origin, error = %err, "session refresh failed");
                RefreshOutcome::Failed
            }
        }
    }

    // == Invalidate ==
    /// Tears the session down after an unrecoverable refresh failure and
    /// redirects to the login entry point once.
    async fn invalidate(&self) {
        self.cache.write().await.clear();
        self.exchange.csrf().clear().await;

        let target = self.login.url_for(&self.location.read().await);
        self.redirects.fetch_add(1, Ordering::Relaxed);
        warn!(%target, "session could not be renewed; redirecting to login");
        self.redirect.redirect(&target);

        // Last: when invoked from the timer task this aborts the caller itself.
        self.stop_timer().await;
    }

    // == Timer ==
    /// Opens a new session: lifts a previous invalidation and starts the timer.
    pub async fn start(self: &Arc<Self>) {
        self.state.lock().await.reopen();
        self.start_timer().await;
    }

    /// Starts the proactive refresh timer; a running timer is left alone.
    pub async fn start_timer(self: &Arc<Self>) {
        let mut timer = self.timer.lock().await;
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        *timer = Some(spawn_refresh_task(Arc::downgrade(self), self.interval));
    }

    /// Stops the proactive refresh timer.
    pub async fn stop_timer(&self) {
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
            debug!("proactive refresh timer stopped");
        }
    }

    pub async fn timer_running(&self) -> bool {
        self.timer
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // == Reset ==
    /// Ends the session: stops the timer and returns the gate to Idle.
    ///
    /// Callers still queued on an interrupted refresh observe a failure.
    pub async fn reset(&self) {
        self.stop_timer().await;
        self.state.lock().await.reset();
        *self.last_renewed_at.write().await = None;
    }

    // == Accessors ==
    pub async fn set_location(&self, path: impl Into<String>) {
        *self.location.write().await = path.into();
    }

    pub async fn is_refreshing(&self) -> bool {
        self.state.lock().await.in_progress()
    }

    /// True after a failed renewal lost the session, until it is started again.
    pub async fn is_invalidated(&self) -> bool {
        self.state.lock().await.is_invalidated()
    }

    pub async fn last_renewed_at(&self) -> Option<DateTime<Utc>> {
        *self.last_renewed_at.read().await
    }

    /// Number of refresh network calls issued.
    pub fn refresh_calls(&self) -> u64 {
        self.refresh_calls.load(Ordering::Relaxed)
    }

    /// Number of login redirects performed.
    pub fn redirects(&self) -> u64 {
        self.redirects.load(Ordering::Relaxed)
    }
}

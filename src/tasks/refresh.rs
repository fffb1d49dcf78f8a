//! Proactive Refresh Task
//!
//! Background task that renews the session credential on a fixed interval,
//! ahead of the access token's real expiry.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::{RefreshOrigin, RefreshOutcome, SessionRefreshManager};

/// Spawns a background task that periodically refreshes the session.
///
/// The task sleeps for `interval`, then renews through the same gate as
/// reactive recovery, so a tick during an outstanding refresh joins it instead
/// of issuing a second call. After a successful renewal it schedules the next
/// tick; after a failure it logs and stops, leaving reactive recovery as the
/// backstop.
///
/// The task holds only a weak reference: once the session manager is dropped
/// the next tick ends the task.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted when the session ends.
pub fn spawn_refresh_task(
    session: Weak<SessionRefreshManager>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting proactive refresh task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(session) = session.upgrade() else {
                debug!("session dropped; proactive refresh task exiting");
                break;
            };

            match session.renew(RefreshOrigin::Scheduled).await {
                RefreshOutcome::Renewed => debug!("proactive refresh succeeded"),
                RefreshOutcome::Failed => {
                    warn!("proactive refresh failed; timer not rescheduled");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::models::ApiResponse;
    use crate::transport::tests::ScriptedTransport;
    use crate::ApiClient;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn client(transport: Arc<ScriptedTransport>) -> ApiClient {
        let config = Config {
            refresh_interval: 60,
            ..Config::default()
        };
        ApiClient::builder(config)
            .transport(transport)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_refreshes_on_interval() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("POST /auth/refresh", Ok(ApiResponse::ok(json!({}))));
        let client = client(transport.clone());

        client.start_session().await;
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(transport.calls_to("POST /auth/refresh"), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(transport.calls_to("POST /auth/refresh"), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.calls_to("POST /auth/refresh"), 2);
        assert!(client.session().timer_running().await);

        client.end_session().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_stops_after_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            "POST /auth/refresh",
            Err(crate::error::ApiError::from_status(401, json!({}))),
        );
        let client = client(transport.clone());

        client.start_session().await;
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(transport.calls_to("POST /auth/refresh"), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(transport.calls_to("POST /auth/refresh"), 1);
        assert!(!client.session().timer_running().await);
        // A failed scheduled refresh alone never redirects
        assert_eq!(client.session().redirects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_session_cancels_timer() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("POST /auth/refresh", Ok(ApiResponse::ok(json!({}))));
        let client = client(transport.clone());

        client.start_session().await;
        client.end_session().await;

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(transport.calls_to("POST /auth/refresh"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_session_is_idempotent() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("POST /auth/refresh", Ok(ApiResponse::ok(json!({}))));
        let client = client(transport.clone());

        client.start_session().await;
        client.start_session().await;
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(transport.calls_to("POST /auth/refresh"), 1);
        client.end_session().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_exits_when_session_dropped() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("POST /auth/refresh", Ok(ApiResponse::ok(json!({}))));
        let client = client(transport.clone());

        client.start_session().await;
        drop(client);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.calls_to("POST /auth/refresh"), 0);
    }
}

//! Session collaborators
//!
//! The two outbound notifications the session layer issues: re-establishing
//! the real-time channel after a credential rotation, and sending the user to
//! the login surface when the session cannot be recovered.

use reqwest::Url;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::transport::parse_base_url;

/// Real-time connection that must be rebuilt whenever credentials rotate.
pub trait RealtimeBridge: Send + Sync {
    fn reconnect(&self);
}

/// Terminal failure path: hand the user over to the login entry point.
pub trait LoginRedirect: Send + Sync {
    fn redirect(&self, target: &str);
}

/// Used when no real-time channel is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRealtime;

impl RealtimeBridge for NoRealtime {
    fn reconnect(&self) {
        debug!("no realtime bridge configured; skipping reconnect");
    }
}

/// Logs the redirect target instead of navigating.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect(&self, target: &str) {
        warn!(target, "session invalidated; login required");
    }
}

// == Login Target ==
/// Builds login redirect URLs carrying the caller's return path.
#[derive(Debug, Clone)]
pub struct LoginTarget {
    login_url: Url,
    return_param: String,
}

impl LoginTarget {
    /// Resolves `login_url` against `base_url`; absolute login URLs are kept.
    pub fn new(base_url: &str, login_url: &str, return_param: impl Into<String>) -> Result<Self> {
        let login_url = parse_base_url(base_url)?.join(login_url).map_err(|e| {
            ApiError::InvalidRequest(format!("invalid login url `{}`: {}", login_url, e))
        })?;

        Ok(Self {
            login_url,
            return_param: return_param.into(),
        })
    }

    /// Login URL with `return_path` appended as an encoded query parameter.
    pub fn url_for(&self, return_path: &str) -> String {
        let mut url = self.login_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.return_param, return_path);
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_target_relative_to_origin() {
        let target = LoginTarget::new("http://localhost:8080/api/", "/login", "returnUrl").unwrap();
        assert_eq!(
            target.url_for("/missions?tab=active"),
            "http://localhost:8080/login?returnUrl=%2Fmissions%3Ftab%3Dactive"
        );
    }

    #[test]
    fn test_login_target_absolute_url() {
        let target =
            LoginTarget::new("http://localhost:8080/api/", "https://sso.example.com/signin", "next")
                .unwrap();
        assert_eq!(
            target.url_for("/"),
            "https://sso.example.com/signin?next=%2F"
        );
    }
}

//! Cache Eligibility Policy
//!
//! Decides which requests may be answered from, and written to, the cache.

use crate::models::{normalize_path, ApiRequest};

/// Path fragments whose data is too volatile or too sensitive to serve stale.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &[
    "auth/",
    "session",
    "profile",
    "users/me",
    "notifications",
    "admin/",
    "orders",
    "missions",
    "inventory",
    "friends",
    "system/settings",
    "csrf",
];

// == Cache Policy ==
/// Eligibility rules applied by the pipeline before touching the cache.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Normalized exclusion fragments
    exclusions: Vec<String>,
}

impl CachePolicy {
    pub fn new<I, S>(exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            exclusions: exclusions
                .into_iter()
                .map(|p| normalize_path(p.as_ref()))
                .collect(),
        }
    }

    /// Returns true when `path` contains any excluded fragment.
    ///
    /// Both sides are normalized to a single leading slash, so `notifications`,
    /// `/notifications` and `api/notifications/unread` all match the same rule.
    pub fn is_excluded(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.exclusions
            .iter()
            .any(|fragment| path.contains(fragment.as_str()))
    }

    /// Only idempotent reads outside the exclusion list are cacheable.
    pub fn is_cacheable(&self, request: &ApiRequest) -> bool {
        request.method.is_idempotent_read() && !self.is_excluded(&request.path)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_PATHS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_reads_are_cacheable() {
        let policy = CachePolicy::default();
        assert!(policy.is_cacheable(&ApiRequest::get("/reports").query("month", 1)));
        assert!(policy.is_cacheable(&ApiRequest::get("users").query("page", 2)));
    }

    #[test]
    fn test_mutations_are_never_cacheable() {
        let policy = CachePolicy::default();
        assert!(!policy.is_cacheable(&ApiRequest::post("/reports")));
        assert!(!policy.is_cacheable(&ApiRequest::delete("/reports/1")));
    }

    #[test]
    fn test_excluded_paths_ignore_leading_slash() {
        let policy = CachePolicy::default();
        assert!(policy.is_excluded("/notifications"));
        assert!(policy.is_excluded("notifications"));
        assert!(policy.is_excluded("/v1/notifications/unread"));
        assert!(policy.is_excluded("admin/users"));
        assert!(!policy.is_cacheable(&ApiRequest::get("profile")));
    }

    #[test]
    fn test_fragment_with_leading_slash_matches_relative_path() {
        let policy = CachePolicy::new(["/reports"]);
        assert!(policy.is_excluded("reports/monthly"));
        assert!(!policy.is_excluded("users"));
    }

    #[test]
    fn test_custom_policy_without_exclusions() {
        let policy = CachePolicy::new(Vec::<String>::new());
        assert!(policy.is_cacheable(&ApiRequest::get("/notifications")));
    }
}

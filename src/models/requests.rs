//! Outgoing request model
//!
//! Describes a call to the backend API and derives its fingerprint.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

// == Method ==
/// HTTP verbs the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Returns true for verbs that change server state and need a CSRF token.
    pub fn is_mutating(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch | Method::Delete)
    }

    /// Returns true for read-only verbs whose responses may be cached.
    pub fn is_idempotent_read(self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

// == Api Request ==
/// A request travelling through the pipeline.
///
/// Query parameters are kept sorted so that logically identical requests share a
/// fingerprint regardless of the order in which parameters were added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Already re-issued after a session refresh
    #[serde(skip)]
    pub(crate) auth_retried: bool,
    /// Already re-issued after a CSRF token refresh
    #[serde(skip)]
    pub(crate) csrf_retried: bool,
    /// This is the session refresh call itself
    #[serde(skip)]
    pub(crate) is_refresh: bool,
}

impl ApiRequest {
    // == Constructors ==
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            auth_retried: false,
            csrf_retried: false,
            is_refresh: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    // == Builders ==
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn refresh_call(mut self) -> Self {
        self.is_refresh = true;
        self
    }

    // == Fingerprint ==
    /// Cache and coalescing key: method, normalized path and form-encoded query.
    ///
    /// Query pairs are percent-encoded, so a value containing `&` or `=` can
    /// never read as extra parameters. Requests carrying a body append it with
    /// a length prefix, so distinct payloads sent to the same endpoint are never
    /// merged into one call.
    pub fn fingerprint(&self) -> String {
        let mut key = format!("{} {}", self.method, self.normalized_path().replace('#', "%23"));

        if !self.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.query)
                .finish();
            key.push('?');
            key.push_str(&query);
        }

        if let Some(body) = &self.body {
            let body = body.to_string();
            key.push_str(&format!("#{}:{}", body.len(), body));
        }

        key
    }

    /// Path with exactly one leading slash, used for display and matching.
    pub fn normalized_path(&self) -> String {
        normalize_path(&self.path)
    }
}

/// Makes path matching insensitive to a missing or repeated leading slash.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

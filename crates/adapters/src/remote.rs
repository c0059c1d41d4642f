// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! iTop REST client seam.
//!
//! The watcher only needs `request(params) -> JSON`. The HTTP client posts
//! `json_data` to `webservices/rest.php` and maps transport, status, and
//! iTop `code` failures onto [`RemoteError`].

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// REST API version requested from iTop.
pub const API_VERSION: &str = "1.3";

/// iTop REST `code` for rejected credentials.
const ITOP_CODE_UNAUTHORIZED: i64 = 1;

/// Errors from remote requests
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Credentials were rejected; retrying will not help.
    #[error("authentication rejected: {0}")]
    AuthInvalid(String),
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    #[error("remote error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn is_auth_invalid(&self) -> bool {
        matches!(self, Self::AuthInvalid(_))
    }
}

/// Token used to authenticate one request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Adapter for issuing authenticated requests to iTop
#[async_trait]
pub trait RemoteClient: Clone + Send + Sync + 'static {
    /// Send one REST operation and return the decoded response body.
    async fn request(&self, credential: &Credential, params: &Value) -> Result<Value, RemoteError>;
}

/// Interpret an iTop response body: `code == 0` is success.
pub fn check_response(body: Value) -> Result<Value, RemoteError> {
    let code = match body.get("code") {
        Some(code) => code
            .as_i64()
            .ok_or_else(|| RemoteError::Malformed(format!("non-integer code: {code}")))?,
        None => return Err(RemoteError::Malformed("missing code".to_string())),
    };
    if code == 0 {
        return Ok(body);
    }
    let message = body.get("message").and_then(Value::as_str).unwrap_or_default().to_string();
    if code == ITOP_CODE_UNAUTHORIZED {
        return Err(RemoteError::AuthInvalid(message));
    }
    Err(RemoteError::Api { code, message })
}

/// HTTP client for an iTop instance.
#[derive(Clone)]
pub struct HttpRemoteClient {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpRemoteClient {
    /// `base_url` is the iTop root, e.g. `https://itop.example.com`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        let endpoint = format!(
            "{}/webservices/rest.php?version={}",
            base_url.trim_end_matches('/'),
            API_VERSION
        );
        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn request(&self, credential: &Credential, params: &Value) -> Result<Value, RemoteError> {
        let json_data = params.to_string();
        let response = self
            .http
            .post(&self.endpoint)
            .header("Auth-Token", credential.token())
            .form(&[("json_data", json_data.as_str())])
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RemoteError::AuthInvalid(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(RemoteError::Unavailable(format!("HTTP {}", status.as_u16())));
        }

        let body: Value =
            response.json().await.map_err(|e| RemoteError::Malformed(e.to_string()))?;
        check_response(body)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{Credential, RemoteClient, RemoteError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Route {
        class: String,
        key_contains: String,
        response: Result<Value, RemoteError>,
    }

    #[derive(Default)]
    struct FakeRemoteState {
        routes: Vec<Route>,
        calls: Vec<Value>,
    }

    /// Scripted iTop for tests.
    ///
    /// Requests are matched against routes by `class` and a substring of
    /// `key`; the most recently added matching route wins. Unmatched
    /// requests return an empty object set.
    #[derive(Clone, Default)]
    pub struct FakeRemoteClient {
        inner: Arc<Mutex<FakeRemoteState>>,
    }

    impl FakeRemoteClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Respond to `core/get` on `class` whose key contains `key_contains`.
        pub fn when(&self, class: &str, key_contains: &str, response: Result<Value, RemoteError>) {
            self.inner.lock().routes.push(Route {
                class: class.to_string(),
                key_contains: key_contains.to_string(),
                response,
            });
        }

        /// Respond with the given objects, keyed `Class::id`.
        pub fn objects(&self, class: &str, key_contains: &str, objects: Vec<(String, Value)>) {
            let mut map = serde_json::Map::new();
            for (id, fields) in objects {
                map.insert(
                    format!("{class}::{id}"),
                    json!({ "code": 0, "class": class, "key": id, "fields": fields }),
                );
            }
            self.when(class, key_contains, Ok(json!({ "code": 0, "message": "", "objects": map })));
        }

        /// Every request received, in order.
        pub fn calls(&self) -> Vec<Value> {
            self.inner.lock().calls.clone()
        }

        /// Requests for one class.
        pub fn calls_for(&self, class: &str) -> Vec<Value> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter(|c| c.get("class").and_then(Value::as_str) == Some(class))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl RemoteClient for FakeRemoteClient {
        async fn request(
            &self,
            _credential: &Credential,
            params: &Value,
        ) -> Result<Value, RemoteError> {
            let mut inner = self.inner.lock();
            inner.calls.push(params.clone());
            let class = params.get("class").and_then(Value::as_str).unwrap_or_default();
            let key = match params.get("key") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            let matched = inner
                .routes
                .iter()
                .rev()
                .find(|r| r.class == class && key.contains(&r.key_contains))
                .map(|r| r.response.clone());
            matched.unwrap_or_else(|| Ok(json!({ "code": 0, "message": "", "objects": null })))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRemoteClient;

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;

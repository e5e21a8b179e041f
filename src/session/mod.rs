//! Session credential lookup
//!
//! Credentials are supplied from outside: a remote key/value table checked
//! first, then cookie exports on local disk. Lookups never fail loudly; an
//! unreachable or empty store reads as "no credential".

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
}

/// Key/value table exposed over a PostgREST endpoint (`settings(key, value)`).
pub struct RemoteSessionStore {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SettingRow {
    value: Option<serde_json::Value>,
}

impl RemoteSessionStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client for session store: {}", e);
                Client::new()
            });
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, key: &str) -> String {
        format!(
            "{}/rest/v1/settings?select=value&key=eq.{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(key)
        )
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, reqwest::Error> {
        let rows: Vec<SettingRow> = self
            .client
            .get(self.endpoint(key))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(rows
            .into_iter()
            .find_map(|row| row.value)
            .and_then(|value| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) if s.is_empty() => None,
                serde_json::Value::String(s) => Some(s),
                other => Some(other.to_string()),
            }))
    }
}

#[async_trait]
impl SessionStore for RemoteSessionStore {
    async fn get(&self, key: &str) -> Option<String> {
        match self.fetch(key).await {
            Ok(value) => {
                debug!("Remote store lookup for {}: {}", key, value.is_some());
                value
            }
            Err(e) => {
                warn!("Remote store lookup for {} failed: {}", key, e);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExportedCookie {
    name: String,
    value: Option<String>,
}

/// Reads single cookies out of browser cookie exports (JSON arrays of
/// `{name, value, ...}` objects).
#[derive(Debug, Default)]
pub struct CookieFileStore {
    entries: HashMap<String, (PathBuf, String)>,
}

impl CookieFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `key` from the cookie named `cookie_name` in `path`.
    pub fn with_cookie(
        mut self,
        key: impl Into<String>,
        path: impl Into<PathBuf>,
        cookie_name: impl Into<String>,
    ) -> Self {
        self.entries
            .insert(key.into(), (path.into(), cookie_name.into()));
        self
    }
}

#[async_trait]
impl SessionStore for CookieFileStore {
    async fn get(&self, key: &str) -> Option<String> {
        let (path, cookie_name) = self.entries.get(key)?;
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Cookie export {:?} unavailable: {}", path, e);
                return None;
            }
        };
        let cookies: Vec<ExportedCookie> = match serde_json::from_str(&raw) {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!("Cookie export {:?} is not a cookie array: {}", path, e);
                return None;
            }
        };
        cookies
            .into_iter()
            .find(|c| &c.name == cookie_name)
            .and_then(|c| c.value)
            .filter(|v| !v.is_empty())
    }
}

/// Remote store first, local fallback second.
pub struct TieredSessionStore {
    remote: Option<Box<dyn SessionStore>>,
    local: Box<dyn SessionStore>,
}

impl TieredSessionStore {
    pub fn new(remote: Option<Box<dyn SessionStore>>, local: Box<dyn SessionStore>) -> Self {
        Self { remote, local }
    }
}

#[async_trait]
impl SessionStore for TieredSessionStore {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(remote) = &self.remote {
            if let Some(value) = remote.get(key).await {
                debug!("Session {} loaded from remote store", key);
                return Some(value);
            }
        }
        let value = self.local.get(key).await;
        if value.is_some() {
            debug!("Session {} loaded from local store", key);
        }
        value
    }
}

//! HTTP page fetching for scraping strategies

use crate::utils::error::ResolveError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Ordered request headers. Names must be lowercase.
pub type Headers = Vec<(&'static str, String)>;

/// Fetch a page body as text. Non-success statuses are errors.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get_text(&self, url: &str, headers: &Headers) -> Result<String, ResolveError>;
}

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

fn header_map(headers: &Headers) -> Result<HeaderMap, ResolveError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ResolveError::Transport(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ResolveError::Transport(format!("invalid header {}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn get_text(&self, url: &str, headers: &Headers) -> Result<String, ResolveError> {
        let response = self
            .client
            .get(url)
            .headers(header_map(headers)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Transport(format!("HTTP {} from {}", status, url)));
        }

        let body = response.text().await?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

//! Cookie export handling
//!
//! Browser extensions export cookies as a JSON array; yt-dlp wants the flat
//! Netscape text format. Converted files are written back to disk once and
//! reused. Concurrent writers produce identical content from the same source.

use crate::session::SessionStore;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonCookie {
    domain: Option<String>,
    path: Option<String>,
    #[serde(default)]
    secure: bool,
    expiration_date: Option<f64>,
    name: Option<String>,
    value: Option<String>,
}

/// Convert a JSON cookie export to Netscape format.
///
/// Returns `None` when the input is not a JSON array of cookies. Entries
/// without a name or value are dropped.
pub fn to_netscape(json: &str, default_domain: &str) -> Option<String> {
    let cookies: Vec<JsonCookie> = serde_json::from_str(json).ok()?;

    let mut lines = vec![NETSCAPE_HEADER.to_string()];
    for cookie in cookies {
        let (Some(name), Some(value)) = (cookie.name, cookie.value) else {
            continue;
        };
        if name.is_empty() || value.is_empty() {
            continue;
        }
        let domain = cookie.domain.unwrap_or_else(|| default_domain.to_string());
        let include_subdomains = if domain.starts_with('.') { "TRUE" } else { "FALSE" };
        let path = cookie.path.unwrap_or_else(|| "/".to_string());
        let secure = if cookie.secure { "TRUE" } else { "FALSE" };
        let expiry = cookie
            .expiration_date
            .map(|e| e.floor() as i64)
            .unwrap_or(0);
        lines.push(format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            domain, include_subdomains, path, secure, expiry, name, value
        ));
    }
    Some(lines.join("\n"))
}

/// Make sure a Netscape cookie file exists at `path`.
///
/// An existing file that still holds a JSON export is converted in place.
/// Without a file, the session store is asked for `store_key` and the value
/// (converted when it is a JSON export) is written out. Returns the path when
/// a cookie file is available.
pub async fn prepare_cookie_file(
    path: &Path,
    store: &dyn SessionStore,
    store_key: &str,
    default_domain: &str,
) -> Option<PathBuf> {
    if let Ok(content) = tokio::fs::read_to_string(path).await {
        let content = content.trim();
        if content.starts_with('[') {
            if let Some(netscape) = to_netscape(content, default_domain) {
                if let Err(e) = tokio::fs::write(path, netscape).await {
                    warn!("Failed to rewrite cookie file {:?}: {}", path, e);
                } else {
                    debug!("Converted cookie export {:?} to Netscape format", path);
                }
            }
        }
        return Some(path.to_path_buf());
    }

    let stored = store.get(store_key).await?;
    let content = to_netscape(&stored, default_domain).unwrap_or(stored);
    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!("Failed to create cookie directory {:?}: {}", parent, e);
            return None;
        }
    }
    match tokio::fs::write(path, content).await {
        Ok(()) => {
            debug!("Cookie file {:?} written from session store", path);
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!("Failed to write cookie file {:?}: {}", path, e);
            None
        }
    }
}

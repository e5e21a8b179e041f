//! Filesystem locations used during resolution
//!
//! Cookie files live in the data directory; ad pre-downloads land in a temp
//! directory beneath it unless configured otherwise:
//! - macOS: ~/Library/Application Support/vidresolve
//! - Windows: %APPDATA%\vidresolve
//! - Linux: ~/.local/share/vidresolve

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default data directory, falling back to `./vidresolve` when the platform
/// directory cannot be determined.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("vidresolve"))
        .unwrap_or_else(|| {
            warn!("Could not determine data directory, using ./vidresolve");
            PathBuf::from("vidresolve")
        })
}

pub fn youtube_cookie_file(data_dir: &Path) -> PathBuf {
    data_dir.join("youtube_cookies.txt")
}

/// Structured cookie export (JSON array) holding the Instagram session.
pub fn instagram_cookie_export(data_dir: &Path) -> PathBuf {
    data_dir.join("instagram_cookies.json")
}

/// Flat-text cookie file handed to the downloader for Instagram posts.
pub fn instagram_cookie_file(data_dir: &Path) -> PathBuf {
    data_dir.join("instagram_cookies.txt")
}

/// Collision-avoiding file name for a pre-downloaded ad: identifier plus
/// millisecond timestamp.
pub fn ad_file_name(identifier: &str) -> String {
    format!("ad_{}_{}.mp4", identifier, Utc::now().timestamp_millis())
}

/// Ensure a directory exists, logging instead of failing.
pub fn ensure_dir(dir: &Path) -> bool {
    match std::fs::create_dir_all(dir) {
        Ok(()) => {
            debug!("Directory ready: {:?}", dir);
            true
        }
        Err(e) => {
            warn!("Failed to create directory {:?}: {}", dir, e);
            false
        }
    }
}

/// Join a served prefix and a file name without doubling slashes.
pub fn served_path(prefix: &str, file_name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), file_name)
}

//! yt-dlp wrapper
//!
//! yt-dlp serves two roles: as the format extractor for hosting-platform
//! links (structured JSON dump) and as the downloader process used for ad
//! pre-downloads. Both roles sit behind traits so resolvers can be tested
//! without the binary.

use crate::resolver::models::MediaInfo;
use crate::utils::error::ResolveError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

/// Structured metadata retrieval for a media URL.
#[async_trait]
pub trait FormatExtractor: Send + Sync {
    async fn dump(&self, url: &str, cookie_file: Option<&Path>) -> Result<MediaInfo, ResolveError>;
}

/// External process that downloads a post into a local file.
///
/// Returning `Ok` only means the process exited cleanly; callers still check
/// the output with [`verify_download`].
#[async_trait]
pub trait DownloaderProcess: Send + Sync {
    async fn download(
        &self,
        target_url: &str,
        output: &Path,
        cookie_file: Option<&Path>,
    ) -> Result<(), ResolveError>;
}

/// Check that a download produced a file larger than `min_bytes`.
pub fn verify_download(output: &Path, min_bytes: u64) -> Result<u64, ResolveError> {
    let size = std::fs::metadata(output)
        .map_err(|e| {
            ResolveError::ProcessFailure(format!("output {:?} missing: {}", output, e))
        })?
        .len();
    if size <= min_bytes {
        return Err(ResolveError::ProcessFailure(format!(
            "output {:?} too small ({} bytes)",
            output, size
        )));
    }
    Ok(size)
}

/// yt-dlp invoked as a subprocess
pub struct YtDlp {
    ytdlp_path: PathBuf,
}

impl YtDlp {
    /// Locate yt-dlp, preferring `explicit` when given.
    ///
    /// Search order:
    /// 1. Explicit path from settings
    /// 2. Next to the current executable
    /// 3. System PATH
    /// 4. Common installation paths
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ResolveError> {
        match find_ytdlp(explicit) {
            Some(path) => {
                info!("Found yt-dlp at: {}", path.display());
                Ok(Self { ytdlp_path: path })
            }
            None => {
                error!("yt-dlp not found anywhere!");
                Err(ResolveError::YtDlpNotFound)
            }
        }
    }

    pub fn with_path(ytdlp_path: PathBuf) -> Self {
        Self { ytdlp_path }
    }

    /// Get the path to yt-dlp being used
    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }
}

/// Arguments for a structured single-JSON dump.
fn dump_args(url: &str, cookie_file: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "--dump-single-json".to_string(),
        "--no-check-certificates".to_string(),
        "--no-warnings".to_string(),
        "--prefer-free-formats".to_string(),
    ];
    if let Some(cookies) = cookie_file {
        args.push("--cookies".to_string());
        args.push(cookies.to_string_lossy().into_owned());
    }
    args.push(url.to_string());
    args
}

/// Arguments for downloading a single post to `output`.
fn download_args(target_url: &str, output: &Path, cookie_file: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "--no-check-certificate".to_string(),
        "-o".to_string(),
        output.to_string_lossy().into_owned(),
        "--no-playlist".to_string(),
    ];
    if let Some(cookies) = cookie_file {
        args.push("--cookies".to_string());
        args.push(cookies.to_string_lossy().into_owned());
    }
    args.push(target_url.to_string());
    args
}

#[async_trait]
impl FormatExtractor for YtDlp {
    /// Uses: yt-dlp --dump-single-json
    async fn dump(&self, url: &str, cookie_file: Option<&Path>) -> Result<MediaInfo, ResolveError> {
        debug!("Dumping media info for URL: {}", url);

        let output = AsyncCommand::new(&self.ytdlp_path)
            .args(dump_args(url, cookie_file))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ResolveError::Transport(format!("failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp extraction failed: {}", error_msg);
            return Err(ResolveError::Transport(error_msg.trim().to_string()));
        }

        let info: MediaInfo = serde_json::from_slice(&output.stdout)?;
        Ok(info)
    }
}

#[async_trait]
impl DownloaderProcess for YtDlp {
    async fn download(
        &self,
        target_url: &str,
        output: &Path,
        cookie_file: Option<&Path>,
    ) -> Result<(), ResolveError> {
        info!("Downloading {} to {:?} with yt-dlp", target_url, output);

        let result = AsyncCommand::new(&self.ytdlp_path)
            .args(download_args(target_url, output, cookie_file))
            .stdin(Stdio::null())
            .output()
            .await;

        let result = match result {
            Ok(result) => result,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("yt-dlp is not installed at {:?}", self.ytdlp_path);
                return Err(ResolveError::YtDlpNotFound);
            }
            Err(e) => return Err(ResolveError::ProcessFailure(e.to_string())),
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = {
                let chars: Vec<char> = stderr.chars().collect();
                chars[chars.len().saturating_sub(300)..].iter().collect()
            };
            warn!("yt-dlp download failed ({}): {}", result.status, tail);
            return Err(ResolveError::ProcessFailure(format!(
                "yt-dlp exited with {}",
                result.status
            )));
        }
        Ok(())
    }
}

// ============================================================
// yt-dlp Detection Functions
// ============================================================

/// Find yt-dlp binary with priority:
/// 1. Explicit path
/// 2. Next to the executable
/// 3. System PATH
/// 4. Common installation paths
pub fn find_ytdlp(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if is_executable(path) {
            return Some(path.to_path_buf());
        }
        warn!("Configured yt-dlp is not executable: {:?}", path);
    }

    if let Some(local) = find_beside_executable() {
        debug!("Using yt-dlp next to executable: {:?}", local);
        return Some(local);
    }

    if let Ok(path) = which::which("yt-dlp") {
        debug!("Using system yt-dlp: {:?}", path);
        return Some(path);
    }

    if let Some(common) = find_in_common_paths() {
        debug!("Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }

    warn!("yt-dlp not found anywhere!");
    None
}

fn find_beside_executable() -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let candidate = exe_path.parent()?.join("yt-dlp");
    is_executable(&candidate).then_some(candidate)
}

fn find_in_common_paths() -> Option<PathBuf> {
    let common_paths = [
        // macOS Homebrew (Apple Silicon)
        "/opt/homebrew/bin/yt-dlp",
        // macOS Homebrew (Intel)
        "/usr/local/bin/yt-dlp",
        // System
        "/usr/bin/yt-dlp",
        // User local
        "~/.local/bin/yt-dlp",
    ];

    common_paths
        .iter()
        .map(|path_str| match path_str.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(path_str)),
            None => PathBuf::from(path_str),
        })
        .find(|path| is_executable(path))
}

/// Check if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

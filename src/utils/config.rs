//! Resolver configuration

use crate::utils::error::ResolveError;
use crate::utils::paths;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Directory holding cookie files
    pub data_dir: PathBuf,

    /// Directory receiving ad pre-downloads, `data_dir/temp` when unset
    pub temp_dir: Option<PathBuf>,

    /// Path prefix under which `temp_dir` is served to callers
    pub served_prefix: String,

    /// Explicit yt-dlp binary, discovered when unset
    pub ytdlp_path: Option<PathBuf>,

    /// Explicit Chrome/Chromium binary, discovered when unset
    pub chrome_path: Option<PathBuf>,

    /// Remote key/value store (PostgREST endpoint base URL)
    pub remote_store_url: Option<String>,

    /// API key for the remote store
    pub remote_store_key: Option<String>,

    pub http_timeout_secs: u64,

    pub navigation_timeout_secs: u64,

    /// Fixed wait after page load for late script-issued requests
    pub settle_delay_ms: u64,

    /// Upper bound for one whole resolution, delegation included
    pub resolve_deadline_secs: u64,

    /// Downloads at or below this size count as failed
    pub min_download_bytes: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            data_dir: paths::default_data_dir(),
            temp_dir: None,
            served_prefix: "/temp".to_string(),
            ytdlp_path: None,
            chrome_path: None,
            remote_store_url: None,
            remote_store_key: None,
            http_timeout_secs: 15,
            navigation_timeout_secs: 30,
            settle_delay_ms: 3000,
            resolve_deadline_secs: 120,
            min_download_bytes: 1000,
        }
    }
}

impl ResolverSettings {
    /// Load settings with precedence: environment > explicit file > ./vidresolve.toml
    /// > ~/.config/vidresolve/vidresolve.toml > defaults.
    ///
    /// `SUPABASE_URL`, `SUPABASE_KEY` and `PUPPETEER_EXECUTABLE_PATH` are honored
    /// for deployments configured for the older service.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ResolveError> {
        let mut builder = Config::builder();

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/vidresolve/vidresolve.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }
        builder = builder.add_source(File::with_name("vidresolve").required(false));
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix("VIDRESOLVE"));

        let mut settings: ResolverSettings = builder
            .build()
            .map_err(|e| ResolveError::Config(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ResolveError::Config(format!("Failed to parse configuration: {}", e)))?;

        settings.apply_legacy_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if self.remote_store_url.is_none() {
            self.remote_store_url = non_empty("SUPABASE_URL");
        }
        if self.remote_store_key.is_none() {
            self.remote_store_key = non_empty("SUPABASE_KEY");
        }
        if self.chrome_path.is_none() {
            self.chrome_path = non_empty("PUPPETEER_EXECUTABLE_PATH").map(PathBuf::from);
        }
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("temp"))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn resolve_deadline(&self) -> Duration {
        Duration::from_secs(self.resolve_deadline_secs)
    }

    /// Settings rooted in a single directory, used by tests and embedded callers.
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            data_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }
}

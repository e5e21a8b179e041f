//! Short-form social post resolver
//!
//! Needs a logged-in session. Lookups go through an ordered strategy ladder
//! ([`strategies::default_strategies`]); the first strategy that locates a
//! video wins. Sponsored posts are additionally pre-downloaded, since their
//! CDN links tend to be gated by the session that scraped them.

pub mod payload;
pub mod strategies;

pub use strategies::{default_strategies, Hit, PostRequest, Strategy};

use crate::extract::ladder::instagram_post;
use crate::resolver::models::{Attempt, Exhausted, PlatformDetails, Resolution, VideoReference};
use crate::resolver::traits::Resolver;
use crate::session::SessionStore;
use crate::tools::browser::DESKTOP_USER_AGENT;
use crate::tools::http::{Headers, PageFetcher};
use crate::tools::ytdlp::{verify_download, DownloaderProcess};
use crate::utils::config::ResolverSettings;
use crate::utils::error::ResolveError;
use crate::utils::paths;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SESSION_KEY: &str = "instagram_sessionid";

/// Where sponsored posts are cached and how they are served back.
#[derive(Debug, Clone)]
pub struct AdDownloads {
    pub temp_dir: PathBuf,
    pub served_prefix: String,
    /// Netscape cookie file handed to the downloader when it exists
    pub cookie_file: PathBuf,
    pub min_bytes: u64,
}

impl AdDownloads {
    pub fn from_settings(settings: &ResolverSettings) -> Self {
        Self {
            temp_dir: settings.temp_dir(),
            served_prefix: settings.served_prefix.clone(),
            cookie_file: paths::instagram_cookie_file(&settings.data_dir),
            min_bytes: settings.min_download_bytes,
        }
    }
}

/// Local copy of a sponsored post.
struct CachedAd {
    served: String,
    path: PathBuf,
}

pub struct InstagramResolver {
    fetcher: Arc<dyn PageFetcher>,
    sessions: Arc<dyn SessionStore>,
    downloader: Arc<dyn DownloaderProcess>,
    ads: AdDownloads,
    strategies: Vec<Box<dyn Strategy>>,
}

impl InstagramResolver {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        sessions: Arc<dyn SessionStore>,
        downloader: Arc<dyn DownloaderProcess>,
        ads: AdDownloads,
    ) -> Self {
        Self {
            fetcher,
            sessions,
            downloader,
            ads,
            strategies: default_strategies(),
        }
    }

    /// Replace the strategy ladder.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn Strategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    async fn load_session(&self) -> Option<String> {
        let raw = self.sessions.get(SESSION_KEY).await?;
        Some(decode_session(raw))
    }

    async fn finish(&self, url: &str, shortcode: &str, hit: Hit) -> VideoReference {
        let cached = if hit.is_ad {
            info!("Sponsored post, pre-downloading");
            self.cache_ad(url, shortcode).await
        } else {
            None
        };

        let (video_url, local_path) = match cached {
            Some(ad) => (ad.served, Some(ad.path)),
            None => {
                if hit.is_ad {
                    info!("Pre-download failed, returning remote URL");
                }
                (hit.video_url, None)
            }
        };

        VideoReference {
            video_url,
            thumbnail_url: hit.thumbnail_url,
            title: hit.title,
            details: PlatformDetails::Instagram {
                shortcode: shortcode.to_string(),
                is_ad: hit.is_ad,
                local_path,
            },
        }
    }

    /// Download the post through the external downloader. Any failure
    /// yields `None`; the partial output is removed.
    async fn cache_ad(&self, url: &str, shortcode: &str) -> Option<CachedAd> {
        if !paths::ensure_dir(&self.ads.temp_dir) {
            return None;
        }
        let file_name = paths::ad_file_name(shortcode);
        let output = self.ads.temp_dir.join(&file_name);
        let cookie_file = self.ads.cookie_file.exists().then_some(self.ads.cookie_file.as_path());

        let downloaded = self
            .downloader
            .download(url, &output, cookie_file)
            .await
            .and_then(|()| verify_download(&output, self.ads.min_bytes));
        match downloaded {
            Ok(size) => {
                info!(
                    "Ad video saved: {} ({:.2}MB)",
                    file_name,
                    size as f64 / 1024.0 / 1024.0
                );
                Some(CachedAd {
                    served: paths::served_path(&self.ads.served_prefix, &file_name),
                    path: output,
                })
            }
            Err(e) => {
                warn!("Ad pre-download failed: {}", e);
                if let Err(e) = tokio::fs::remove_file(&output).await {
                    debug!("No partial download to remove: {}", e);
                }
                None
            }
        }
    }
}

/// Session cookies are often stored percent-encoded; undecodable values are
/// used as-is.
pub fn decode_session(raw: String) -> String {
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

/// Request headers for every strategy. The user id is the session's leading
/// segment; the referer follows the post's path type.
pub fn build_headers(session: &str, url_type: &str, shortcode: &str) -> Headers {
    let ds_user_id = session.split(':').next().unwrap_or_default();
    vec![
        ("user-agent", DESKTOP_USER_AGENT.to_string()),
        ("accept", "*/*".to_string()),
        ("accept-language", "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7".to_string()),
        ("cookie", format!("sessionid={}; ds_user_id={}", session, ds_user_id)),
        ("x-ig-app-id", "936619743392459".to_string()),
        ("x-asbd-id", "129477".to_string()),
        ("x-requested-with", "XMLHttpRequest".to_string()),
        ("sec-fetch-dest", "empty".to_string()),
        ("sec-fetch-mode", "cors".to_string()),
        ("sec-fetch-site", "same-origin".to_string()),
        (
            "referer",
            format!("https://www.instagram.com/{}/{}/", url_type, shortcode),
        ),
    ]
}

#[async_trait]
impl Resolver for InstagramResolver {
    fn id(&self) -> &'static str {
        "instagram"
    }

    fn supports(&self, url: &str) -> bool {
        url.contains("instagram.com/")
    }

    async fn resolve(&self, url: &str) -> Result<Resolution, ResolveError> {
        info!("Resolving Instagram URL: {}", url);

        let Some((url_type, shortcode)) = instagram_post(url) else {
            info!("No shortcode in URL");
            let mut exhausted = Exhausted::default();
            exhausted.push(Attempt::empty("shortcode"));
            return Ok(Resolution::NotFound(exhausted));
        };
        debug!("Shortcode: {} (type {})", shortcode, url_type);

        let session = self.load_session().await.ok_or_else(|| {
            ResolveError::MissingCredential(format!(
                "no {} in the session store; save Instagram cookies first",
                SESSION_KEY
            ))
        })?;

        let request = PostRequest {
            headers: build_headers(&session, &url_type, &shortcode),
            shortcode: shortcode.clone(),
        };

        let mut exhausted = Exhausted::default();
        for strategy in &self.strategies {
            let name = strategy.name();
            match strategy.attempt(self.fetcher.as_ref(), &request).await {
                Ok(Some(hit)) => {
                    info!("Video URL located by {}", name);
                    return Ok(Resolution::Found(self.finish(url, &shortcode, hit).await));
                }
                Ok(None) => {
                    debug!("{} returned no video", name);
                    exhausted.push(Attempt::empty(name));
                }
                Err(e) => {
                    warn!("{} failed: {}", name, e);
                    exhausted.push(Attempt::failed(name, e.kind(), e.to_string()));
                }
            }
        }

        info!("All strategies exhausted for {}", shortcode);
        Ok(Resolution::NotFound(exhausted))
    }
}

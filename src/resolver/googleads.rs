//! Ad-transparency page resolver
//!
//! The ad pages render their creative inside script-built frames, so the
//! page is loaded in a headless browser. Hosting-platform references are
//! collected from network responses and from the rendered markup of the page
//! and its frames; the first identifier found is handed back as a delegated
//! reference for the hosting-platform resolver.

use crate::extract::ladder::{bare_hosting_id, HOSTING_CONTENT_LADDER, HOSTING_REFERENCE_LADDER};
use crate::resolver::models::{Attempt, Exhausted, PlatformDetails, Resolution, VideoReference};
use crate::resolver::traits::Resolver;
use crate::tools::browser::{BrowserLauncher, BrowserSession, LaunchOptions};
use crate::utils::error::ResolveError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const STRATEGY: &str = "browser-scan";

/// Response URLs worth keeping.
const HOSTING_TRAFFIC: &[&str] = &[
    "youtube.com/watch",
    "youtu.be/",
    "youtube.com/embed/",
    "googlevideo.com",
];

pub struct GoogleAdsResolver {
    launcher: Arc<dyn BrowserLauncher>,
    options: LaunchOptions,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

impl GoogleAdsResolver {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        options: LaunchOptions,
        navigation_timeout: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            launcher,
            options,
            navigation_timeout,
            settle_delay,
        }
    }

    /// Load the page and gather every hosting-platform reference, network
    /// captures first, then markup matches, deduplicated.
    async fn collect_references(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<Vec<String>, ResolveError> {
        let mut captured: Vec<String> = Vec::new();
        {
            let mut observer = |response_url: &str| {
                if is_hosting_traffic(response_url) {
                    debug!("Hosting reference in traffic: {:.80}", response_url);
                    captured.push(response_url.to_string());
                }
            };
            info!("Loading ad page: {}", url);
            session
                .navigate(url, self.navigation_timeout, &mut observer)
                .await?;
            session.settle(self.settle_delay, &mut observer).await;
        }

        let mut scanned = scan_markup(&session.content().await?);
        debug!("{} references in page markup", scanned.len());

        match session.frame_contents().await {
            Ok(frames) => {
                for frame in frames {
                    scanned.extend(scan_markup(&frame));
                }
            }
            Err(e) => debug!("Frame markup unavailable: {}", e),
        }

        let references = dedup(captured.into_iter().chain(scanned));
        info!("{} unique hosting references collected", references.len());
        Ok(references)
    }
}

pub fn is_hosting_traffic(url: &str) -> bool {
    HOSTING_TRAFFIC.iter().any(|pattern| url.contains(pattern))
}

/// Every hosting reference in a markup document.
pub fn scan_markup(html: &str) -> Vec<String> {
    HOSTING_CONTENT_LADDER
        .scan(html)
        .into_iter()
        .map(|m| m.value)
        .collect()
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Identifiers in first-seen order: ladder matches over every reference,
/// then references that are themselves identifier-sized.
pub fn extract_hosting_ids(references: &[String]) -> Vec<String> {
    let from_ladder = references
        .iter()
        .flat_map(|reference| HOSTING_REFERENCE_LADDER.each_rung(reference))
        .map(|m| m.value);
    let bare = references.iter().filter_map(|r| bare_hosting_id(r));
    dedup(from_ladder.chain(bare))
}

fn delegated_reference(video_id: &str) -> VideoReference {
    VideoReference {
        video_url: format!("https://www.youtube.com/watch?v={}", video_id),
        thumbnail_url: Some(format!(
            "https://img.youtube.com/vi/{}/maxresdefault.jpg",
            video_id
        )),
        title: "Google Ads Video".to_string(),
        details: PlatformDetails::GoogleAds {
            video_id: video_id.to_string(),
            delegate_to_youtube: true,
        },
    }
}

#[async_trait]
impl Resolver for GoogleAdsResolver {
    fn id(&self) -> &'static str {
        "googleads"
    }

    fn supports(&self, url: &str) -> bool {
        url.contains("adstransparency.google.com")
    }

    async fn resolve(&self, url: &str) -> Result<Resolution, ResolveError> {
        let mut exhausted = Exhausted::default();

        let mut session = match self.launcher.launch(&self.options).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Browser launch failed: {}", e);
                exhausted.push(Attempt::failed(STRATEGY, e.kind(), e.to_string()));
                return Ok(Resolution::NotFound(exhausted));
            }
        };

        let collected = self.collect_references(session.as_mut(), url).await;
        if let Err(e) = session.close().await {
            warn!("Browser close reported an error: {}", e);
        }

        let references = match collected {
            Ok(references) => references,
            Err(e) => {
                warn!("Ad page scan failed: {}", e);
                exhausted.push(Attempt::failed(STRATEGY, e.kind(), e.to_string()));
                return Ok(Resolution::NotFound(exhausted));
            }
        };

        let ids = extract_hosting_ids(&references);
        debug!("Extracted identifiers: {}", ids.join(", "));
        match ids.first() {
            Some(video_id) => {
                info!("Ad creative hosted as {}", video_id);
                Ok(Resolution::Found(delegated_reference(video_id)))
            }
            None => {
                info!("No hosting-platform video found on ad page");
                exhausted.push(Attempt::empty(STRATEGY));
                Ok(Resolution::NotFound(exhausted))
            }
        }
    }
}

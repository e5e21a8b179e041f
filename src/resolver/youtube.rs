//! Hosting-platform resolver
//!
//! Metadata comes from the external format extractor; this module only picks
//! the identifier and the format.

use crate::extract::ladder::hosting_id;
use crate::resolver::models::{
    Attempt, Exhausted, Format, MediaInfo, PlatformDetails, Resolution, VideoReference,
};
use crate::resolver::traits::Resolver;
use crate::session::SessionStore;
use crate::tools::cookies::prepare_cookie_file;
use crate::tools::ytdlp::FormatExtractor;
use crate::utils::error::ResolveError;
use async_trait::async_trait;
use std::cmp::Reverse;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_CONTAINER: &str = "mp4";
const COOKIE_STORE_KEY: &str = "youtube_cookie";
const COOKIE_DOMAIN: &str = ".youtube.com";

pub struct YouTubeResolver {
    extractor: Arc<dyn FormatExtractor>,
    sessions: Arc<dyn SessionStore>,
    cookie_file: PathBuf,
}

impl YouTubeResolver {
    pub fn new(
        extractor: Arc<dyn FormatExtractor>,
        sessions: Arc<dyn SessionStore>,
        cookie_file: PathBuf,
    ) -> Self {
        Self {
            extractor,
            sessions,
            cookie_file,
        }
    }
}

/// Tallest format among `formats`; the earliest wins ties.
fn tallest<'a>(formats: impl Iterator<Item = &'a Format>) -> Option<&'a Format> {
    formats.min_by_key(|f| Reverse(f.height.unwrap_or(0)))
}

/// Pick the format to return, in strict priority order:
/// 1. combined audio+video, default container, direct URL, tallest
/// 2. default container, direct URL, tallest
/// 3. first direct URL in any container
/// 4. first entry with any URL, manifests included
pub fn select_format(formats: &[Format]) -> Option<&Format> {
    let in_default = |f: &&Format| f.ext == DEFAULT_CONTAINER && f.direct_url().is_some();

    tallest(formats.iter().filter(in_default).filter(|f| f.is_combined()))
        .or_else(|| tallest(formats.iter().filter(in_default)))
        .or_else(|| formats.iter().find(|f| f.direct_url().is_some()))
        .or_else(|| {
            formats
                .iter()
                .find(|f| f.url.as_deref().is_some_and(|u| !u.is_empty()))
        })
}

fn build_reference(video_id: &str, info: MediaInfo) -> Option<VideoReference> {
    let selected = select_format(&info.formats);
    if selected.is_some_and(|f| f.direct_url().is_none()) {
        info!("No direct stream available, falling back to manifest");
    }
    let quality = selected
        .map(Format::quality_label)
        .unwrap_or_else(|| "unknown".to_string());
    let video_url = selected
        .and_then(|f| f.url.clone())
        .or(info.url)
        .filter(|u| !u.is_empty())?;

    info!("Selected quality: {}", quality);
    Some(VideoReference {
        video_url,
        thumbnail_url: info.thumbnail,
        title: info
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "YouTube Video".to_string()),
        details: PlatformDetails::YouTube {
            video_id: video_id.to_string(),
            quality,
        },
    })
}

#[async_trait]
impl Resolver for YouTubeResolver {
    fn id(&self) -> &'static str {
        "youtube"
    }

    fn supports(&self, url: &str) -> bool {
        hosting_id(url).is_some()
            || url.contains("youtube.com/watch")
            || url.contains("youtube.com/shorts")
            || url.contains("youtu.be/")
    }

    async fn resolve(&self, url: &str) -> Result<Resolution, ResolveError> {
        info!("Resolving hosting-platform URL: {}", url);

        let Some(video_id) = hosting_id(url) else {
            info!("No video identifier in URL");
            let mut exhausted = Exhausted::default();
            exhausted.push(Attempt::empty("identifier"));
            return Ok(Resolution::NotFound(exhausted));
        };
        debug!("Video ID: {}", video_id);

        let cookie_file = prepare_cookie_file(
            &self.cookie_file,
            self.sessions.as_ref(),
            COOKIE_STORE_KEY,
            COOKIE_DOMAIN,
        )
        .await;
        if let Some(path) = &cookie_file {
            debug!("Using cookie file: {:?}", path);
        }

        let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);
        let info = self
            .extractor
            .dump(&watch_url, cookie_file.as_deref())
            .await?;
        debug!(
            "Extractor returned {} formats for {:?}",
            info.formats.len(),
            info.title
        );

        match build_reference(&video_id, info) {
            Some(reference) => Ok(Resolution::Found(reference)),
            None => {
                info!("No downloadable URL for {}", video_id);
                let mut exhausted = Exhausted::default();
                exhausted.push(Attempt::empty("format-selection"));
                Ok(Resolution::NotFound(exhausted))
            }
        }
    }
}

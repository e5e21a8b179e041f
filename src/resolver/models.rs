//! Data structures for resolution results

use crate::utils::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Source platform tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Instagram,
    GoogleAds,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
            Platform::GoogleAds => "googleads",
        }
    }

    pub fn fallback_title(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube Video",
            Platform::Instagram => "Instagram Reels Video",
            Platform::GoogleAds => "Google Ads Video",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform-specific part of a resolved reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum PlatformDetails {
    YouTube {
        video_id: String,
        quality: String,
    },
    Instagram {
        shortcode: String,
        is_ad: bool,
        /// Set when `video_url` points at a pre-downloaded local copy.
        local_path: Option<PathBuf>,
    },
    GoogleAds {
        video_id: String,
        /// The caller must re-resolve `video_url` through the hosting-platform
        /// resolver to obtain a direct stream.
        delegate_to_youtube: bool,
    },
}

/// Resolved, directly playable video.
///
/// `video_url` is always a fetchable URL or a served local path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoReference {
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub title: String,
    #[serde(flatten)]
    pub details: PlatformDetails,
}

impl VideoReference {
    pub fn platform(&self) -> Platform {
        match self.details {
            PlatformDetails::YouTube { .. } => Platform::YouTube,
            PlatformDetails::Instagram { .. } => Platform::Instagram,
            PlatformDetails::GoogleAds { .. } => Platform::GoogleAds,
        }
    }

    /// URL to re-dispatch when this reference is only an intermediary.
    pub fn delegation_target(&self) -> Option<&str> {
        match &self.details {
            PlatformDetails::GoogleAds {
                delegate_to_youtube: true,
                ..
            } => Some(&self.video_url),
            _ => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(
            self.details,
            PlatformDetails::Instagram {
                local_path: Some(_),
                ..
            }
        )
    }
}

/// Where a scraped candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Direct `video_url` field
    VideoUrlField,
    /// First entry of a `video_versions` array
    VideoVersions,
    /// `src` attribute of a video element
    VideoElement,
    /// Raw CDN `.mp4` URL anywhere in the payload
    CdnMp4,
    /// Raw CDN URL on the newer restricted path
    CdnRestricted,
}

/// Unranked URL located during one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub source: CandidateSource,
}

impl Candidate {
    pub fn new(url: impl Into<String>, source: CandidateSource) -> Self {
        Self {
            url: url.into(),
            source,
        }
    }

    /// Legacy delivery path (`/v/`), as opposed to the restricted `/o1/v/` path.
    pub fn is_legacy_path(&self) -> bool {
        self.url.contains("/v/") && !self.url.contains("/o1/v/")
    }
}

/// How a single strategy attempt ended without producing a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The strategy ran and found nothing.
    Empty,
    /// The strategy could not run to completion.
    Failed { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: String,
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn empty(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            outcome: AttemptOutcome::Empty,
        }
    }

    pub fn failed(strategy: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            outcome: AttemptOutcome::Failed {
                kind,
                message: message.into(),
            },
        }
    }
}

/// Record of everything tried before giving up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exhausted {
    pub attempts: Vec<Attempt>,
}

impl Exhausted {
    pub fn nothing_to_try() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    /// True when at least one strategy broke rather than coming back empty,
    /// i.e. the same URL may resolve on a later try.
    pub fn had_failures(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| matches!(a.outcome, AttemptOutcome::Failed { .. }))
    }
}

/// Outcome of a resolution call that did not error.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(VideoReference),
    NotFound(Exhausted),
}

impl Resolution {
    pub fn found(&self) -> Option<&VideoReference> {
        match self {
            Resolution::Found(reference) => Some(reference),
            Resolution::NotFound(_) => None,
        }
    }

    pub fn into_found(self) -> Option<VideoReference> {
        match self {
            Resolution::Found(reference) => Some(reference),
            Resolution::NotFound(_) => None,
        }
    }
}

/// One entry of the format extractor's format list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Format {
    #[serde(default)]
    pub format_id: String,
    /// Container, e.g. `mp4`, `webm`
    #[serde(default)]
    pub ext: String,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub url: Option<String>,
    pub height: Option<u32>,
    pub format_note: Option<String>,
    pub resolution: Option<String>,
}

impl Format {
    /// URL that can be fetched directly (not a playlist manifest).
    pub fn direct_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty() && !u.contains(".m3u8") && !u.contains("manifest"))
    }

    /// Carries both video and audio. Missing codec fields count as present.
    pub fn is_combined(&self) -> bool {
        self.vcodec.as_deref() != Some("none") && self.acodec.as_deref() != Some("none")
    }

    pub fn quality_label(&self) -> String {
        self.format_note
            .clone()
            .or_else(|| self.resolution.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Structured dump returned by the format extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub formats: Vec<Format>,
    pub url: Option<String>,
}

//! Candidate, thumbnail and caption extraction from post payloads
//!
//! Payloads are scanned as text, not parsed: the same fields show up in
//! GraphQL JSON, legacy API JSON and embed markup with different nesting.

use crate::extract::canonical::canonicalize;
use crate::extract::ladder::{PatternLadder, Rung};
use crate::resolver::models::{Candidate, CandidateSource};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::debug;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid payload pattern {pattern}: {e}"))
}

static VIDEO_URL_FIELD: Lazy<Rung> =
    Lazy::new(|| Rung::first_group("video_url", r#""video_url"\s*:\s*"([^"]+)""#));

static VIDEO_VERSIONS: Lazy<Regex> =
    Lazy::new(|| compile(r#""video_versions"\s*:\s*\[([^\]]+)\]"#));

static VERSION_URL: Lazy<Regex> = Lazy::new(|| compile(r#""url"\s*:\s*"([^"]+)""#));

/// Raw CDN links, escaped or not.
static CDN_MP4: Lazy<Regex> = Lazy::new(|| {
    compile(r#"https?:(?:\\/|/){2}[^"]*?cdninstagram\.com(?:\\/|/)[^"]*?\.mp4[^"]*"#)
});

static CDN_RESTRICTED: Lazy<Regex> = Lazy::new(|| {
    compile(r#"https?:(?:\\/|/){2}[^"]*?cdninstagram\.com(?:\\/|/)o1(?:\\/|/)v(?:\\/|/)[^"]+"#)
});

static VIDEO_ELEMENT_SRC: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r#"video[^>]*src="([^"]+\.mp4[^"]*)""#)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("invalid video element pattern: {e}"))
});

pub static THUMBNAIL_LADDER: Lazy<PatternLadder> = Lazy::new(|| {
    PatternLadder::new(vec![
        Rung::first_group("display_url", r#""display_url"\s*:\s*"([^"]+)""#),
        Rung::first_group("thumbnail_url", r#""thumbnail_url"\s*:\s*"([^"]+)""#),
        Rung::first_group("image_versions2", r#""image_versions2"[^}]*"url"\s*:\s*"([^"]+)""#),
    ])
});

/// A whole JSON string value, escapes included.
static CAPTION: Lazy<Rung> = Lazy::new(|| {
    Rung::first_group("caption", r#""text"\s*:\s*"((?:[^"\\]|\\.)*)""#)
});

const CAPTION_MAX_CHARS: usize = 100;

static AD_MARKERS: Lazy<Regex> = Lazy::new(|| {
    compile(r#"product_type\.ad|"product_type"\s*:\s*"ad"|"is_paid_partnership"\s*:\s*true"#)
});

/// Every candidate in the payload: direct `video_url` fields first, then the
/// first entry of each `video_versions` array.
pub fn extract_candidates(payload: &str) -> Vec<Candidate> {
    let direct = VIDEO_URL_FIELD
        .apply_all(payload)
        .map(|url| Candidate::new(canonicalize(&url), CandidateSource::VideoUrlField));

    let versions = VIDEO_VERSIONS.captures_iter(payload).filter_map(|caps| {
        let entries = caps.get(1)?.as_str();
        let url = VERSION_URL.captures(entries)?.get(1)?.as_str();
        Some(Candidate::new(canonicalize(url), CandidateSource::VideoVersions))
    });

    direct
        .chain(versions)
        .filter(|c| !c.url.is_empty())
        .collect()
}

/// Legacy delivery path wins; otherwise the first candidate found.
pub fn rank(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates
        .iter()
        .find(|c| c.is_legacy_path())
        .or_else(|| candidates.first())
}

/// Raw CDN links anywhere in the payload, used when no field matched.
pub fn cdn_fallback(payload: &str) -> Option<Candidate> {
    if let Some(m) = CDN_MP4.find(payload) {
        return Some(Candidate::new(canonicalize(m.as_str()), CandidateSource::CdnMp4));
    }
    CDN_RESTRICTED
        .find(payload)
        .map(|m| Candidate::new(canonicalize(m.as_str()), CandidateSource::CdnRestricted))
}

/// Best video candidate in a JSON payload.
pub fn best_candidate(payload: &str) -> Option<Candidate> {
    let candidates = extract_candidates(payload);
    for (i, candidate) in candidates.iter().enumerate() {
        debug!("Candidate {} ({:?}): {}", i + 1, candidate.source, candidate.url);
    }
    rank(&candidates).cloned().or_else(|| cdn_fallback(payload))
}

/// First `video_url` field, without ranking.
pub fn first_video_url_field(markup: &str) -> Option<Candidate> {
    VIDEO_URL_FIELD
        .apply(markup)
        .map(|url| Candidate::new(canonicalize(&url), CandidateSource::VideoUrlField))
        .filter(|c| !c.url.is_empty())
}

/// `src` of a `<video>` element pointing at an `.mp4`.
pub fn video_element_src(markup: &str) -> Option<Candidate> {
    VIDEO_ELEMENT_SRC
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| Candidate::new(canonicalize(m.as_str()), CandidateSource::VideoElement))
}

pub fn thumbnail(payload: &str) -> Option<String> {
    THUMBNAIL_LADDER
        .first_value(payload)
        .map(|url| canonicalize(&url))
}

/// First caption of 1 to 100 characters without quotes, or `fallback`.
/// Lengths count decoded characters, not JSON escapes.
pub fn title(payload: &str, fallback: &str) -> String {
    CAPTION
        .apply_all(payload)
        .map(|raw| unescape_json_string(&raw))
        .find(|text| {
            let chars = text.chars().count();
            (1..=CAPTION_MAX_CHARS).contains(&chars) && !text.contains('"')
        })
        .unwrap_or_else(|| fallback.to_string())
}

/// Decode JSON string escapes (`\uXXXX` pairs included). Fragments that are
/// not valid JSON strings are returned unchanged.
fn unescape_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

pub fn has_ad_markers(payload: &str) -> bool {
    AD_MARKERS.is_match(payload)
}

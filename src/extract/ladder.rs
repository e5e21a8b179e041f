//! Ordered pattern ladders
//!
//! A ladder is an ordered list of rungs, each pairing a regex with an
//! extractor over its captures. Evaluation is "first match wins" unless the
//! caller asks for every rung's match.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Pulls a value out of a successful match.
pub type Extractor = fn(&Captures<'_>) -> Option<String>;

/// One (pattern, extractor) pair.
pub struct Rung {
    pub name: &'static str,
    pub pattern: Regex,
    extract: Extractor,
}

impl Rung {
    pub fn new(name: &'static str, pattern: &str, extract: Extractor) -> Self {
        Self {
            name,
            // Rung patterns are literals in this crate; a bad one is a programming error.
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid rung {name}: {e}")),
            extract,
        }
    }

    /// Rung yielding the first capture group.
    pub fn first_group(name: &'static str, pattern: &str) -> Self {
        Self::new(name, pattern, |caps| caps.get(1).map(|m| m.as_str().to_string()))
    }

    /// Apply this rung alone.
    pub fn apply(&self, input: &str) -> Option<String> {
        self.pattern.captures(input).and_then(|caps| (self.extract)(&caps))
    }

    /// Every non-overlapping match of this rung.
    pub fn apply_all<'a>(&'a self, input: &'a str) -> impl Iterator<Item = String> + 'a {
        self.pattern
            .captures_iter(input)
            .filter_map(move |caps| (self.extract)(&caps))
    }
}

/// Value produced by a ladder, tagged with the rung that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderMatch {
    pub rung: &'static str,
    pub value: String,
}

pub struct PatternLadder {
    rungs: Vec<Rung>,
}

impl PatternLadder {
    pub fn new(rungs: Vec<Rung>) -> Self {
        Self { rungs }
    }

    pub fn rungs(&self) -> &[Rung] {
        &self.rungs
    }

    /// First rung (in order) that yields a value.
    pub fn first_match(&self, input: &str) -> Option<LadderMatch> {
        self.rungs.iter().find_map(|rung| {
            rung.apply(input).map(|value| LadderMatch {
                rung: rung.name,
                value,
            })
        })
    }

    pub fn first_value(&self, input: &str) -> Option<String> {
        self.first_match(input).map(|m| m.value)
    }

    /// The first match of every rung, in rung order.
    pub fn each_rung(&self, input: &str) -> Vec<LadderMatch> {
        self.rungs
            .iter()
            .filter_map(|rung| {
                rung.apply(input).map(|value| LadderMatch {
                    rung: rung.name,
                    value,
                })
            })
            .collect()
    }

    /// Every match of every rung, grouped by rung order.
    pub fn scan(&self, input: &str) -> Vec<LadderMatch> {
        self.rungs
            .iter()
            .flat_map(|rung| {
                rung.apply_all(input).map(move |value| LadderMatch {
                    rung: rung.name,
                    value,
                })
            })
            .collect()
    }
}

/// Hosting-platform identifier ladder: watch query, shorts path, short
/// domain, embed path.
pub static HOSTING_ID_LADDER: Lazy<PatternLadder> = Lazy::new(|| {
    PatternLadder::new(vec![
        Rung::first_group("watch", r"youtube\.com/watch\?v=([A-Za-z0-9_-]{11})"),
        Rung::first_group("shorts", r"youtube\.com/shorts/([A-Za-z0-9_-]{11})"),
        Rung::first_group("short-domain", r"youtu\.be/([A-Za-z0-9_-]{11})"),
        Rung::first_group("embed", r"youtube\.com/embed/([A-Za-z0-9_-]{11})"),
    ])
});

/// Identifier ladder applied to captured references on intermediary pages:
/// the URL shapes plus the structured fields that embed players emit.
pub static HOSTING_REFERENCE_LADDER: Lazy<PatternLadder> = Lazy::new(|| {
    PatternLadder::new(vec![
        Rung::first_group("watch", r"youtube\.com/watch\?v=([A-Za-z0-9_-]{11})"),
        Rung::first_group("embed", r"youtube\.com/embed/([A-Za-z0-9_-]{11})"),
        Rung::first_group("short-domain", r"youtu\.be/([A-Za-z0-9_-]{11})"),
        Rung::first_group("shorts", r"youtube\.com/shorts/([A-Za-z0-9_-]{11})"),
        Rung::first_group("video_id", r"video_id[=:]([A-Za-z0-9_-]{11})"),
        Rung::first_group("videoId", r#""videoId"\s*:\s*"([A-Za-z0-9_-]{11})""#),
    ])
});

/// Whole-reference patterns used to scan rendered markup. Each yields the
/// full matched text so it can be merged with network-captured URLs.
pub static HOSTING_CONTENT_LADDER: Lazy<PatternLadder> = Lazy::new(|| {
    let whole: Extractor = |caps| caps.get(0).map(|m| m.as_str().to_string());
    PatternLadder::new(vec![
        Rung::new(
            "watch",
            r"https?://(?:www\.)?youtube\.com/watch\?v=[A-Za-z0-9_-]{11}",
            whole,
        ),
        Rung::new(
            "embed",
            r"https?://(?:www\.)?youtube\.com/embed/[A-Za-z0-9_-]{11}",
            whole,
        ),
        Rung::new("short-domain", r"https?://youtu\.be/[A-Za-z0-9_-]{11}", whole),
        Rung::new(
            "shorts",
            r"https?://(?:www\.)?youtube\.com/shorts/[A-Za-z0-9_-]{11}",
            whole,
        ),
        Rung::new("videoId", r#""videoId"\s*:\s*"[A-Za-z0-9_-]{11}""#, whole),
        Rung::new("video_id", r"video_id[=:][A-Za-z0-9_-]{11}", whole),
    ])
});

/// Instagram post path: the content type segment and the shortcode.
pub static INSTAGRAM_POST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"instagram\.com/(p|reel|reels|tv)/([A-Za-z0-9_-]+)")
        .unwrap_or_else(|e| panic!("invalid instagram pattern: {e}"))
});

/// Extract the 11-character hosting identifier from any accepted URL shape.
pub fn hosting_id(url: &str) -> Option<String> {
    HOSTING_ID_LADDER.first_value(url)
}

/// Instagram (content type, shortcode) pair.
pub fn instagram_post(url: &str) -> Option<(String, String)> {
    INSTAGRAM_POST
        .captures(url)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// Heuristic: a reference that, stripped of disallowed characters, is
/// exactly identifier-sized is taken as an identifier.
pub fn bare_hosting_id(reference: &str) -> Option<String> {
    let cleaned: String = reference
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (cleaned.len() == 11).then_some(cleaned)
}

//! Normalization of URL fragments scraped out of HTML and JSON payloads.
//!
//! Scraped URLs arrive with any mix of four escaping schemes:
//! - escaped forward slashes (`\/`)
//! - escaped ampersand and percent sequences (`\u0026`, `\u0025`)
//! - HTML-entity ampersands (`&amp;`)
//! - escaped quotes (`\"`)

/// Replacements applied in order during one pass.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("\\u0026", "&"),
    ("\\/", "/"),
    ("\\u0025", "%"),
    ("&amp;", "&"),
    ("\\\"", "\""),
];

fn canonicalize_once(input: &str) -> String {
    let mut out = input.to_string();
    for (from, to) in REPLACEMENTS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out.trim().to_string()
}

/// Canonicalize a scraped URL.
///
/// Passes repeat until the string stops changing, so nested escapes such as
/// `&amp;amp;` fully collapse and re-applying the function is a no-op. Every
/// replacement shortens the string, which bounds the loop.
pub fn canonicalize(input: &str) -> String {
    let mut current = canonicalize_once(input);
    loop {
        let next = canonicalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

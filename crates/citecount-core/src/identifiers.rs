//! Derive lookup keys from an item's fields.
//!
//! Absence is not an error here: an item without a recognizable arXiv id
//! simply falls through to the next identifier in the lookup chain.

use once_cell::sync::Lazy;
use regex::Regex;

/// Extract a modern arXiv id (`NNNN.NNNNN`) from an item's `url` and `extra`
/// fields.
///
/// The URL field wins: `arxiv.org/abs/<id>` or `arxiv.org/pdf/<id>`. If it
/// yields nothing, an `arXiv: <id>` annotation in the extra field is used.
pub fn extract_arxiv_id(url: &str, extra: &str) -> Option<String> {
    static URL_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"arxiv\.org/(?:abs|pdf)/(\d+\.\d+)").unwrap());
    if let Some(caps) = URL_RE.captures(url) {
        return Some(caps.get(1).unwrap().as_str().to_string());
    }

    static EXTRA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"arXiv:\s*(\d+\.\d+)").unwrap());
    if let Some(caps) = EXTRA_RE.captures(extra) {
        return Some(caps.get(1).unwrap().as_str().to_string());
    }

    None
}

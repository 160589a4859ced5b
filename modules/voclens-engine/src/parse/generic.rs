//! Generic fallback parser: loose block heuristics so unknown or
//! newly-added platforms still yield usable text instead of zero results.

use voclens_common::{Platform, ScrapedReview};

use super::{clean_text, parse_json_ld, MIN_REVIEW_TEXT_LEN};

/// Block cap per page; beyond this a page is boilerplate, not reviews.
const MAX_BLOCKS: usize = 50;

/// Navigation/legal fragments that look like prose but never are reviews.
const BOILERPLATE_MARKERS: [&str; 6] = [
    "cookie",
    "privacy policy",
    "terms of service",
    "all rights reserved",
    "sign up",
    "subscribe to our newsletter",
];

pub fn parse(markup: &str) -> Vec<ScrapedReview> {
    let structured = parse_json_ld(markup, Platform::Generic);
    if !structured.is_empty() {
        return structured;
    }

    let block_re = regex::Regex::new(r"(?is)<(p|blockquote|li)[^>]*>(.*?)</(p|blockquote|li)>")
        .expect("valid regex");

    let mut reviews = Vec::new();
    for capture in block_re.captures_iter(markup) {
        let text = clean_text(&capture[2]);
        if text.len() < MIN_REVIEW_TEXT_LEN {
            continue;
        }
        let lowered = text.to_lowercase();
        if BOILERPLATE_MARKERS.iter().any(|m| lowered.contains(m)) {
            continue;
        }

        reviews.push(ScrapedReview::new(
            Platform::Generic,
            None,
            None,
            None,
            text,
            None,
        ));
        if reviews.len() >= MAX_BLOCKS {
            break;
        }
    }
    reviews
}

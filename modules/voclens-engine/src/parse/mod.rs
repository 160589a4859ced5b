//! Platform parsers: pure `markup -> Vec<ScrapedReview>` transforms.
//!
//! Each known platform tries its matchers in priority order — JSON-LD
//! structured data first, then platform markup patterns — and the first
//! matcher that yields any results wins, so overlapping patterns never
//! double-count. Parsers never fail: malformed input is an empty result.

mod capterra;
mod generic;
mod json_ld;
mod reddit;
mod trustpilot;
mod yelp;

pub use json_ld::parse_json_ld;

use chrono::NaiveDate;
use voclens_common::{Platform, ScrapedReview};

/// Reviews shorter than this are markup noise, not customer feedback.
pub const MIN_REVIEW_TEXT_LEN: usize = 20;

/// Dispatch to the platform's parser; unknown platforms get the generic
/// fallback so newly-added sources still yield usable text.
pub fn parse_reviews(platform: Platform, markup: &str) -> Vec<ScrapedReview> {
    match platform {
        Platform::Trustpilot => trustpilot::parse(markup),
        Platform::Capterra => capterra::parse(markup),
        Platform::Reddit => reddit::parse(markup),
        Platform::Yelp => yelp::parse(markup),
        Platform::Generic => generic::parse(markup),
    }
}

// --- Text cleaning ---

/// Strip markup, decode the standard HTML entities, collapse whitespace.
pub(crate) fn clean_text(fragment: &str) -> String {
    let no_blocks = strip_script_and_style(fragment);
    let no_tags = strip_tags(&no_blocks);
    let decoded = decode_entities(&no_tags);
    collapse_whitespace(&decoded)
}

fn strip_script_and_style(markup: &str) -> String {
    let re = regex::Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
        .expect("valid regex");
    re.replace_all(markup, " ").into_owned()
}

fn strip_tags(markup: &str) -> String {
    let re = regex::Regex::new(r"<[^>]*>").expect("valid regex");
    re.replace_all(markup, " ").into_owned()
}

/// Decode the five standard HTML entities plus non-breaking spaces.
/// `&amp;` is decoded last so double-encoded text stays encoded once.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- Field parsing ---

/// Parse a rating into the 1..=5 range; out-of-range and unparseable
/// values become None rather than failing the review.
pub(crate) fn parse_rating(raw: &str) -> Option<u8> {
    let value: f64 = raw.trim().parse().ok()?;
    if !(1.0..=5.0).contains(&value) {
        return None;
    }
    Some(value.round() as u8)
}

/// Best-effort date parsing: ISO dates and RFC 3339 timestamps.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    chrono::DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_markup_and_entities() {
        let html = "<p>Great&nbsp;product &amp; <b>fast</b>\n  shipping&#39;s fine</p>";
        assert_eq!(clean_text(html), "Great product & fast shipping's fine");
    }

    #[test]
    fn clean_text_drops_script_bodies() {
        let html = "<script>var x = '<p>junk</p>';</script><p>Real review text here</p>";
        assert_eq!(clean_text(html), "Real review text here");
    }

    #[test]
    fn double_encoded_entities_decode_once() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn ratings_outside_range_are_dropped() {
        assert_eq!(parse_rating("4.6"), Some(5));
        assert_eq!(parse_rating("0"), None);
        assert_eq!(parse_rating("11"), None);
        assert_eq!(parse_rating("five"), None);
    }

    #[test]
    fn dates_parse_from_iso_and_rfc3339() {
        assert_eq!(
            parse_date("2026-07-01"),
            NaiveDate::from_ymd_opt(2026, 7, 1)
        );
        assert_eq!(
            parse_date("2026-07-01T10:30:00Z"),
            NaiveDate::from_ymd_opt(2026, 7, 1)
        );
        assert_eq!(parse_date("last Tuesday"), None);
    }

    #[test]
    fn unknown_platform_markup_falls_back_to_generic() {
        let html = "<article><p>This product completely changed how our team works, \
                    highly recommended.</p></article>";
        let reviews = parse_reviews(Platform::Generic, html);
        assert_eq!(reviews.len(), 1);
    }
}

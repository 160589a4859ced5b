//! Trustpilot review pages. JSON-LD first; the markup fallback targets
//! the data-* attributes Trustpilot keeps stable across redesigns.

use voclens_common::{Platform, ScrapedReview};

use super::{clean_text, parse_json_ld, parse_rating, MIN_REVIEW_TEXT_LEN};

pub fn parse(markup: &str) -> Vec<ScrapedReview> {
    let structured = parse_json_ld(markup, Platform::Trustpilot);
    if !structured.is_empty() {
        return structured;
    }
    parse_cards(markup)
}

fn parse_cards(markup: &str) -> Vec<ScrapedReview> {
    let card_re = regex::Regex::new(r"(?is)<article[^>]*>(.*?)</article>").expect("valid regex");
    let text_re = regex::Regex::new(
        r#"(?is)<p[^>]*data-service-review-text-typography[^>]*>(.*?)</p>"#,
    )
    .expect("valid regex");
    let name_re = regex::Regex::new(
        r#"(?is)<span[^>]*data-consumer-name-typography[^>]*>(.*?)</span>"#,
    )
    .expect("valid regex");
    let rating_re =
        regex::Regex::new(r#"(?i)stars-(\d)"#).expect("valid regex");
    let date_re = regex::Regex::new(r#"(?is)<time[^>]*datetime\s*=\s*["']([^"']+)["']"#)
        .expect("valid regex");
    let id_re = regex::Regex::new(r#"(?i)data-service-review-card-paper[^>]*id\s*=\s*["']([^"']+)["']"#)
        .expect("valid regex");

    let mut reviews = Vec::new();
    for card in card_re.captures_iter(markup) {
        let body = &card[1];
        let Some(text_match) = text_re.captures(body) else {
            continue;
        };
        let text = clean_text(&text_match[1]);
        if text.len() < MIN_REVIEW_TEXT_LEN {
            continue;
        }

        let reviewer_name = name_re
            .captures(body)
            .map(|c| clean_text(&c[1]))
            .filter(|n| !n.is_empty());
        let rating = rating_re
            .captures(body)
            .and_then(|c| parse_rating(&c[1]));
        let date = date_re
            .captures(body)
            .and_then(|c| super::parse_date(&c[1]));
        let external_id = id_re.captures(body).map(|c| c[1].to_string());

        reviews.push(ScrapedReview::new(
            Platform::Trustpilot,
            external_id,
            reviewer_name,
            rating,
            text,
            date,
        ));
    }
    reviews
}

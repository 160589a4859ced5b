//! Capterra product review pages. JSON-LD first, then the review-card
//! markup with its pros/cons paragraph pairs.

use voclens_common::{Platform, ScrapedReview};

use super::{clean_text, parse_json_ld, parse_rating, MIN_REVIEW_TEXT_LEN};

pub fn parse(markup: &str) -> Vec<ScrapedReview> {
    let structured = parse_json_ld(markup, Platform::Capterra);
    if !structured.is_empty() {
        return structured;
    }
    parse_cards(markup)
}

fn parse_cards(markup: &str) -> Vec<ScrapedReview> {
    let card_re = regex::Regex::new(
        r#"(?is)<div[^>]*class\s*=\s*["'][^"']*review-card[^"']*["'][^>]*>(.*?)</div>\s*</div>"#,
    )
    .expect("valid regex");
    let title_re = regex::Regex::new(r#"(?is)<h3[^>]*>(.*?)</h3>"#).expect("valid regex");
    let body_re = regex::Regex::new(r#"(?is)<p[^>]*>(.*?)</p>"#).expect("valid regex");
    let name_re = regex::Regex::new(
        r#"(?is)<span[^>]*class\s*=\s*["'][^"']*reviewer-name[^"']*["'][^>]*>(.*?)</span>"#,
    )
    .expect("valid regex");
    let rating_re = regex::Regex::new(r#"(?i)data-rating\s*=\s*["']([\d.]+)["']"#)
        .expect("valid regex");

    let mut reviews = Vec::new();
    for card in card_re.captures_iter(markup) {
        // The rating attribute lives on the card's opening tag, so it is
        // matched against the whole card, not the captured inner body.
        let full = &card[0];
        let body = &card[1];

        // Pros/cons live in separate paragraphs; join them into one text.
        let mut parts: Vec<String> = Vec::new();
        if let Some(title) = title_re.captures(body) {
            let cleaned = clean_text(&title[1]);
            if !cleaned.is_empty() {
                parts.push(cleaned);
            }
        }
        for paragraph in body_re.captures_iter(body) {
            let cleaned = clean_text(&paragraph[1]);
            if !cleaned.is_empty() {
                parts.push(cleaned);
            }
        }
        let text = parts.join(" ");
        if text.len() < MIN_REVIEW_TEXT_LEN {
            continue;
        }

        let reviewer_name = name_re
            .captures(body)
            .map(|c| clean_text(&c[1]))
            .filter(|n| !n.is_empty());
        let rating = rating_re
            .captures(full)
            .and_then(|c| parse_rating(&c[1]));

        reviews.push(ScrapedReview::new(
            Platform::Capterra,
            None,
            reviewer_name,
            rating,
            text,
            None,
        ));
    }
    reviews
}

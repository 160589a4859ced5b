//! Structured-data matcher shared by the platform parsers. Most review
//! platforms embed schema.org `Review` objects in JSON-LD script blocks,
//! which is far more stable than their markup.

use serde_json::Value;
use voclens_common::{Platform, ScrapedReview};

use super::{clean_text, parse_date, parse_rating, MIN_REVIEW_TEXT_LEN};

/// Extract schema.org reviews from every JSON-LD block in the markup.
/// Malformed blocks are skipped; an empty vec means "no structured data",
/// letting the caller fall through to markup patterns.
pub fn parse_json_ld(markup: &str, platform: Platform) -> Vec<ScrapedReview> {
    let block_re = regex::Regex::new(
        r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#,
    )
    .expect("valid regex");

    let mut reviews = Vec::new();
    for capture in block_re.captures_iter(markup) {
        let Ok(value) = serde_json::from_str::<Value>(capture[1].trim()) else {
            continue;
        };
        collect_reviews(&value, platform, &mut reviews);
    }
    reviews
}

/// Walk the JSON-LD graph and pull out every `Review` object, wherever
/// the platform nested it (`review`, `@graph`, `itemListElement`, ...).
fn collect_reviews(value: &Value, platform: Platform, out: &mut Vec<ScrapedReview>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_reviews(item, platform, out);
            }
        }
        Value::Object(map) => {
            if map.get("@type").and_then(Value::as_str) == Some("Review") {
                if let Some(review) = review_from_object(map, platform) {
                    out.push(review);
                }
            }
            for child in map.values() {
                if matches!(child, Value::Array(_) | Value::Object(_)) {
                    collect_reviews(child, platform, out);
                }
            }
        }
        _ => {}
    }
}

fn review_from_object(
    map: &serde_json::Map<String, Value>,
    platform: Platform,
) -> Option<ScrapedReview> {
    let body = map
        .get("reviewBody")
        .or_else(|| map.get("description"))
        .and_then(Value::as_str)?;
    let text = clean_text(body);
    if text.len() < MIN_REVIEW_TEXT_LEN {
        return None;
    }

    let reviewer_name = map.get("author").and_then(author_name);
    let rating = map
        .get("reviewRating")
        .and_then(|r| r.get("ratingValue"))
        .and_then(rating_value);
    let date = map
        .get("datePublished")
        .and_then(Value::as_str)
        .and_then(parse_date);
    let external_id = map
        .get("@id")
        .or_else(|| map.get("id"))
        .and_then(Value::as_str)
        .map(String::from);

    Some(ScrapedReview::new(
        platform,
        external_id,
        reviewer_name,
        rating,
        text,
        date,
    ))
}

fn author_name(author: &Value) -> Option<String> {
    match author {
        Value::String(name) => Some(name.clone()),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(String::from),
        _ => None,
    }
}

fn rating_value(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => parse_rating(&n.to_string()),
        Value::String(s) => parse_rating(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><head>
        <script type="application/ld+json">
        {
          "@context": "https://schema.org",
          "@type": "LocalBusiness",
          "review": [
            {
              "@type": "Review",
              "author": {"@type": "Person", "name": "Ana P."},
              "datePublished": "2026-06-12",
              "reviewBody": "Fantastic service, the team went above and beyond.",
              "reviewRating": {"@type": "Rating", "ratingValue": "5"}
            },
            {
              "@type": "Review",
              "author": "Ben",
              "reviewBody": "too short",
              "reviewRating": {"ratingValue": 3}
            }
          ]
        }
        </script>
        </head><body></body></html>
    "#;

    #[test]
    fn extracts_nested_reviews_and_skips_short_ones() {
        let reviews = parse_json_ld(SAMPLE, Platform::Yelp);
        assert_eq!(reviews.len(), 1);
        let review = &reviews[0];
        assert_eq!(review.reviewer_name.as_deref(), Some("Ana P."));
        assert_eq!(review.rating, Some(5));
        assert_eq!(
            review.date,
            chrono::NaiveDate::from_ymd_opt(2026, 6, 12)
        );
    }

    #[test]
    fn malformed_json_ld_is_an_empty_result() {
        let html = r#"<script type="application/ld+json">{not json</script>"#;
        assert!(parse_json_ld(html, Platform::Yelp).is_empty());
    }

    #[test]
    fn graph_wrapped_reviews_are_found() {
        let html = r#"<script type="application/ld+json">
            {"@graph": [{"@type": "Review", "reviewBody": "Long enough review body to count.", "author": "Cy"}]}
        </script>"#;
        let reviews = parse_json_ld(html, Platform::Trustpilot);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].source_platform, Platform::Trustpilot);
    }
}

//! Yelp business pages. Yelp embeds reviews as JSON-LD; the markup
//! fallback catches the comment paragraphs on older page variants.

use voclens_common::{Platform, ScrapedReview};

use super::{clean_text, parse_json_ld, parse_rating, MIN_REVIEW_TEXT_LEN};

pub fn parse(markup: &str) -> Vec<ScrapedReview> {
    let structured = parse_json_ld(markup, Platform::Yelp);
    if !structured.is_empty() {
        return structured;
    }
    parse_comments(markup)
}

fn parse_comments(markup: &str) -> Vec<ScrapedReview> {
    let item_re = regex::Regex::new(r#"(?is)<li[^>]*>(.*?)</li>"#).expect("valid regex");
    let comment_re = regex::Regex::new(
        r#"(?is)<p[^>]*class\s*=\s*["'][^"']*comment__[^"']*["'][^>]*>(.*?)</p>"#,
    )
    .expect("valid regex");
    let name_re = regex::Regex::new(
        r#"(?is)<a[^>]*class\s*=\s*["'][^"']*user-passport[^"']*["'][^>]*>(.*?)</a>"#,
    )
    .expect("valid regex");
    let rating_re = regex::Regex::new(r#"(?i)aria-label\s*=\s*["']([\d.]+) star"#)
        .expect("valid regex");

    let mut reviews = Vec::new();
    for item in item_re.captures_iter(markup) {
        let body = &item[1];
        let Some(comment) = comment_re.captures(body) else {
            continue;
        };
        let text = clean_text(&comment[1]);
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

        reviews.push(ScrapedReview::new(
            Platform::Yelp,
            None,
            reviewer_name,
            rating,
            text,
            None,
        ));
    }
    reviews
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_paragraphs_parse_with_rating() {
        let html = r#"
            <ul>
              <li>
                <a class="user-passport-info" href="/user">Miguel R.</a>
                <div role="img" aria-label="5 star rating"></div>
                <p class="comment__09f24__text">Best tacos in the neighborhood,
                  friendly staff and quick service.</p>
              </li>
              <li><p class="comment__09f24__text">meh</p></li>
            </ul>
        "#;
        let reviews = parse(html);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, Some(5));
        assert_eq!(reviews[0].reviewer_name.as_deref(), Some("Miguel R."));
    }
}

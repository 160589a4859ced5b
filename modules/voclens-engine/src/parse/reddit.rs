//! Reddit search results (old.reddit, server-rendered). Posts are treated
//! as unrated review text; the permalink doubles as the external id.

use voclens_common::{Platform, ScrapedReview};

use super::{clean_text, MIN_REVIEW_TEXT_LEN};

pub fn parse(markup: &str) -> Vec<ScrapedReview> {
    let result_re = regex::Regex::new(
        r#"(?is)<div[^>]*class\s*=\s*["'][^"']*search-result[^"']*["'][^>]*>(.*?)<div[^>]*class\s*=\s*["'][^"']*search-result-meta"#,
    )
    .expect("valid regex");
    let title_re = regex::Regex::new(
        r#"(?is)<a[^>]*class\s*=\s*["'][^"']*search-title[^"']*["'][^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#,
    )
    .expect("valid regex");
    let body_re = regex::Regex::new(
        r#"(?is)<div[^>]*class\s*=\s*["'][^"']*md["'][^>]*>(.*?)</div>"#,
    )
    .expect("valid regex");
    let author_re = regex::Regex::new(
        r#"(?is)<a[^>]*class\s*=\s*["'][^"']*\bauthor\b[^"']*["'][^>]*>(.*?)</a>"#,
    )
    .expect("valid regex");

    let mut reviews = Vec::new();
    for result in result_re.captures_iter(markup) {
        let body = &result[1];

        let Some(title) = title_re.captures(body) else {
            continue;
        };
        let permalink = title[1].to_string();
        let mut text = clean_text(&title[2]);
        if let Some(snippet) = body_re.captures(body) {
            let snippet_text = clean_text(&snippet[1]);
            if !snippet_text.is_empty() {
                text = format!("{text} {snippet_text}");
            }
        }
        if text.len() < MIN_REVIEW_TEXT_LEN {
            continue;
        }

        let reviewer_name = author_re
            .captures(body)
            .map(|c| clean_text(&c[1]))
            .filter(|n| !n.is_empty());

        reviews.push(ScrapedReview::new(
            Platform::Reddit,
            Some(permalink),
            reviewer_name,
            None,
            text,
            None,
        ));
    }
    reviews
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_MARKUP: &str = r#"
        <div class="search-result search-result-link">
          <a class="search-title may-blank" href="https://old.reddit.com/r/software/comments/abc/acme/">
            Anyone else regret switching to Acme?</a>
          <div class="md">We moved the whole org over last quarter and the sync
            constantly breaks.</div>
          <a class="author may-blank" href="/user/dev_kay">dev_kay</a>
        <div class="search-result-meta">...</div>
        <div class="search-result search-result-link">
          <a class="search-title" href="https://old.reddit.com/r/software/comments/def/">ok</a>
        <div class="search-result-meta">...</div>
    "#;

    #[test]
    fn search_results_become_unrated_reviews() {
        let reviews = parse(SEARCH_MARKUP);
        assert_eq!(reviews.len(), 1);
        let review = &reviews[0];
        assert!(review.text.contains("regret switching"));
        assert!(review.text.contains("sync constantly breaks"));
        assert_eq!(review.rating, None);
        assert_eq!(review.reviewer_name.as_deref(), Some("dev_kay"));
        assert!(review
            .external_id
            .as_deref()
            .unwrap()
            .contains("/comments/abc/"));
    }

    #[test]
    fn no_results_page_is_empty() {
        assert!(parse("<div class='searchpane'>no results</div>").is_empty());
    }
}

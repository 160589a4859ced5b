//! Platform registry: everything the pipeline knows about each review
//! platform lives here — how to build candidate URLs, whether a page needs
//! JS rendering, and the pre-fetch quirks (cookie walls, lazy loading)
//! that would otherwise leak into the orchestrator loop.

use std::time::Duration;

use browserless_client::PageAction;
use voclens_common::Platform;

/// Hard per-fetch timeout. Third-party review pages vary wildly in load
/// time; anything slower than this is treated as a failed source.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// How a platform's pages are fetched and paginated.
#[derive(Debug, Clone)]
pub struct PlatformSpec {
    pub platform: Platform,
    /// Whether content only appears after client-side rendering.
    pub render_js: bool,
    /// Steps the rendering service runs before the DOM is captured.
    pub page_actions: Vec<PageAction>,
    /// Maximum pages scraped per source.
    pub page_cap: u32,
    /// Deterministic URL construction is known to miss for this platform,
    /// so resolution falls back to AI-assisted discovery.
    pub ai_discovery: bool,
}

/// All platforms the resolver considers, in scrape priority order.
/// `Generic` is a parser fallback, not a discoverable platform.
pub fn registry() -> Vec<PlatformSpec> {
    vec![
        PlatformSpec {
            platform: Platform::Trustpilot,
            render_js: true,
            // Trustpilot gates the review list behind a cookie-consent
            // overlay and lazy-loads cards on scroll.
            page_actions: vec![
                PageAction::Click {
                    selector: "#onetrust-accept-btn-handler".to_string(),
                },
                PageAction::ScrollToBottom,
                PageAction::WaitMs(1200),
            ],
            page_cap: 3,
            ai_discovery: false,
        },
        PlatformSpec {
            platform: Platform::Capterra,
            render_js: true,
            page_actions: vec![PageAction::ScrollToBottom, PageAction::WaitMs(800)],
            page_cap: 1,
            ai_discovery: true,
        },
        PlatformSpec {
            platform: Platform::Reddit,
            // old.reddit search results are server-rendered.
            render_js: false,
            page_actions: Vec::new(),
            page_cap: 1,
            ai_discovery: true,
        },
        PlatformSpec {
            platform: Platform::Yelp,
            render_js: true,
            page_actions: vec![PageAction::WaitMs(500)],
            page_cap: 1,
            ai_discovery: false,
        },
    ]
}

pub fn spec_for(platform: Platform) -> PlatformSpec {
    registry()
        .into_iter()
        .find(|s| s.platform == platform)
        .unwrap_or(PlatformSpec {
            platform: Platform::Generic,
            render_js: false,
            page_actions: Vec::new(),
            page_cap: 1,
            ai_discovery: false,
        })
}

/// Deterministically construct a candidate review URL for a platform.
/// Pure string transform; returns None where construction is unreliable
/// and discovery should be AI-assisted instead.
pub fn candidate_url(platform: Platform, business_name: &str, domain: &str) -> Option<String> {
    match platform {
        Platform::Trustpilot => Some(format!("https://www.trustpilot.com/review/{domain}")),
        Platform::Yelp => Some(format!("https://www.yelp.com/biz/{}", slugify(business_name))),
        Platform::Reddit => Some(format!(
            "https://old.reddit.com/search?q=%22{}%22+review",
            slugify(business_name).replace('-', "+")
        )),
        Platform::Capterra => None,
        Platform::Generic => None,
    }
}

/// URL for page `page` (1-based) of a source. Platforms without known
/// pagination always return the base URL.
pub fn page_url(platform: Platform, base_url: &str, page: u32) -> String {
    if page <= 1 {
        return base_url.to_string();
    }
    match platform {
        Platform::Trustpilot => {
            let sep = if base_url.contains('?') { '&' } else { '?' };
            format!("{base_url}{sep}page={page}")
        }
        _ => base_url.to_string(),
    }
}

/// Lowercase, alphanumeric-and-hyphen slug of a business name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Registrable domain of a business URL, without the `www.` prefix.
pub fn domain_of(business_url: &str) -> Option<String> {
    let parsed = url::Url::parse(business_url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_lowercase())
}

/// Tokens of a domain used for relevance checks ("acme" from
/// "acme-corp.example.com" yields ["acme", "corp", "example"]).
pub fn domain_tokens(domain: &str) -> Vec<String> {
    domain
        .split(['.', '-'])
        .filter(|t| t.len() > 2 && *t != "www" && *t != "com" && *t != "org" && *t != "net")
        .map(|t| t.to_lowercase())
        .collect()
}

//! Source resolution: turn a business name/URL into a ranked list of
//! candidate review pages, verify each one actually belongs to the
//! business, and swallow per-platform failures so one dead platform
//! never shortens the rest of the list.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use voclens_common::{Platform, ReviewSource};

use crate::fetcher::{FetchOptions, PageFetcher};
use crate::parse::parse_reviews;
use crate::platforms::{self, registry, PlatformSpec};

/// How many AI-suggested URLs to try per platform before giving up.
const MAX_DISCOVERY_CANDIDATES: usize = 3;

/// AI-assisted URL discovery for platforms where deterministic
/// construction has a low hit rate.
#[async_trait]
pub trait UrlDiscoverer: Send + Sync {
    async fn discover(
        &self,
        platform: Platform,
        business_name: &str,
        domain: &str,
    ) -> anyhow::Result<Vec<String>>;
}

/// Discoverer backed by the hosted model: asks for likely review-page
/// URLs and keeps only strict URL matches on the platform's own domain —
/// any surrounding prose is ignored.
pub struct ClaudeDiscoverer {
    claude: ai_client::Claude,
}

const DISCOVERY_SYSTEM_PROMPT: &str = "You locate business review pages. \
Given a business and a review platform, reply with the most likely full URLs \
of that business's review page on that platform, one per line. \
Reply with URLs only, no commentary. If you are not confident, reply NONE.";

impl ClaudeDiscoverer {
    pub fn new(claude: ai_client::Claude) -> Self {
        Self { claude }
    }

    fn platform_host(platform: Platform) -> &'static str {
        match platform {
            Platform::Trustpilot => "trustpilot.com",
            Platform::Capterra => "capterra.com",
            Platform::Reddit => "reddit.com",
            Platform::Yelp => "yelp.com",
            Platform::Generic => "",
        }
    }
}

#[async_trait]
impl UrlDiscoverer for ClaudeDiscoverer {
    async fn discover(
        &self,
        platform: Platform,
        business_name: &str,
        domain: &str,
    ) -> anyhow::Result<Vec<String>> {
        let user_prompt = format!(
            "Business: {business_name}\nWebsite: {domain}\nPlatform: {}",
            platform.label()
        );
        let response = self
            .claude
            .chat_completion(DISCOVERY_SYSTEM_PROMPT, &user_prompt, 0.0)
            .await?;

        let url_re = regex::Regex::new(r#"https?://[^\s"'<>()\[\]]+"#).expect("valid regex");
        let host = Self::platform_host(platform);
        let urls: Vec<String> = url_re
            .find_iter(&response)
            .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
            .filter(|u| u.contains(host))
            .collect();

        info!(platform = %platform, count = urls.len(), "AI discovery returned URLs");
        Ok(urls)
    }
}

pub struct SourceResolver {
    fetcher: Arc<dyn PageFetcher>,
    discoverer: Arc<dyn UrlDiscoverer>,
}

impl SourceResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, discoverer: Arc<dyn UrlDiscoverer>) -> Self {
        Self { fetcher, discoverer }
    }

    /// Resolve all candidate sources for a business. Never fails as a
    /// whole: a platform that cannot be resolved is returned unverified
    /// with a zero estimate.
    pub async fn resolve(&self, business_name: &str, business_url: &str) -> Vec<ReviewSource> {
        let domain = platforms::domain_of(business_url)
            .unwrap_or_else(|| platforms::slugify(business_name));
        let name_token = platforms::slugify(business_name).replace('-', " ");

        let mut sources = Vec::new();
        for spec in registry() {
            let source = self
                .resolve_platform(&spec, business_name, &domain, &name_token)
                .await;
            sources.push(source);
        }

        let verified = sources.iter().filter(|s| s.verified).count();
        info!(
            business = business_name,
            candidates = sources.len(),
            verified,
            "Source resolution complete"
        );
        sources
    }

    async fn resolve_platform(
        &self,
        spec: &PlatformSpec,
        business_name: &str,
        domain: &str,
        name_token: &str,
    ) -> ReviewSource {
        let mut candidates: Vec<String> =
            platforms::candidate_url(spec.platform, business_name, domain)
                .into_iter()
                .collect();

        if spec.ai_discovery {
            match self
                .discoverer
                .discover(spec.platform, business_name, domain)
                .await
            {
                Ok(urls) => {
                    candidates.extend(rank_by_domain_overlap(urls, domain));
                }
                Err(e) => {
                    warn!(platform = %spec.platform, error = %e, "AI discovery failed");
                }
            }
        }

        // Seen-set, not Vec::dedup: AI suggestions can repeat the
        // deterministic candidate non-adjacently, and a repeat would burn
        // one of the verification attempts.
        let mut seen = std::collections::HashSet::new();
        candidates.retain(|url| seen.insert(url.clone()));
        let first_candidate = candidates.first().cloned().unwrap_or_default();

        for url in candidates.into_iter().take(MAX_DISCOVERY_CANDIDATES) {
            match self.verify(spec, &url, domain, name_token).await {
                Some(estimated_count) => {
                    info!(platform = %spec.platform, url, estimated_count, "Verified source");
                    return ReviewSource {
                        platform: spec.platform,
                        candidate_url: url,
                        verified: true,
                        estimated_count,
                    };
                }
                None => continue,
            }
        }

        // Kept for observability; never scraped.
        ReviewSource {
            platform: spec.platform,
            candidate_url: first_candidate,
            verified: false,
            estimated_count: 0,
        }
    }

    /// Existence + relevance check: the page must mention the business's
    /// domain token or name token, which guards against generic search
    /// landing pages masquerading as a match. Returns the parsed review
    /// count as the estimate when the page passes.
    async fn verify(
        &self,
        spec: &PlatformSpec,
        url: &str,
        domain: &str,
        name_token: &str,
    ) -> Option<u32> {
        if url.is_empty() {
            return None;
        }
        let options = FetchOptions {
            render_js: spec.render_js,
            actions: spec.page_actions.clone(),
            ..Default::default()
        };
        let markup = match self.fetcher.fetch(url, &options).await {
            Ok(m) if !m.is_empty() => m,
            Ok(_) => return None,
            Err(e) => {
                warn!(platform = %spec.platform, url, error = %e, "Verification fetch failed");
                return None;
            }
        };

        let lowered = markup.to_lowercase();
        let domain_token = platforms::domain_tokens(domain)
            .into_iter()
            .next()
            .unwrap_or_else(|| domain.to_string());
        if !lowered.contains(&domain_token) && !lowered.contains(name_token) {
            info!(platform = %spec.platform, url, "Candidate page does not mention the business");
            return None;
        }

        Some(parse_reviews(spec.platform, &markup).len() as u32)
    }
}

/// Rank AI-suggested URLs by token overlap with the business domain,
/// highest first; ties keep model order. Resolves the ambiguity of
/// multiple plausible URLs explicitly instead of trusting first-match.
fn rank_by_domain_overlap(urls: Vec<String>, domain: &str) -> Vec<String> {
    let tokens = platforms::domain_tokens(domain);
    let mut scored: Vec<(usize, String)> = urls
        .into_iter()
        .map(|url| {
            let lowered = url.to_lowercase();
            let score = tokens.iter().filter(|t| lowered.contains(t.as_str())).count();
            (score, url)
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, url)| url).collect()
}

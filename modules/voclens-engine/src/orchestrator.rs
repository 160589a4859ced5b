//! Scrape orchestration: walk the verified sources one at a time,
//! paginate where the platform supports it, dedup, and persist. Sources
//! are isolated from each other; only storage failures abort the job.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use voclens_common::{JobState, ReviewSource, ScrapedReview};

use crate::dedup::FingerprintSet;
use crate::fetcher::{FetchOptions, PageFetcher};
use crate::parse::parse_reviews;
use crate::platforms::{self, spec_for};
use crate::progress::ProgressReporter;
use crate::store::ReviewStore;

/// One source's outcome, recorded whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: ReviewSource,
    pub success: bool,
    /// New reviews persisted from this source (post-dedup).
    pub review_count: u32,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct ScrapeStats {
    pub sources_attempted: u32,
    pub sources_failed: u32,
    pub reviews_parsed: u32,
    pub reviews_new: u32,
    pub outcomes: Vec<SourceOutcome>,
}

impl std::fmt::Display for ScrapeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sources ({} failed), {} parsed, {} new",
            self.sources_attempted, self.sources_failed, self.reviews_parsed, self.reviews_new
        )
    }
}

pub struct ScrapeOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn ReviewStore>,
    reporter: Arc<dyn ProgressReporter>,
}

impl ScrapeOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn ReviewStore>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            fetcher,
            store,
            reporter,
        }
    }

    /// Scrape every verified source for a company. Unverified sources are
    /// skipped up front. Fetch and parse failures mark the source failed
    /// and move on; a storage failure propagates and fails the job.
    pub async fn scrape_all(
        &self,
        report_id: Uuid,
        company_id: Uuid,
        sources: &[ReviewSource],
    ) -> anyhow::Result<ScrapeStats> {
        let verified: Vec<&ReviewSource> = sources.iter().filter(|s| s.verified).collect();
        let total = verified.len();

        let mut fingerprints = FingerprintSet::new(self.store.load_fingerprints(company_id).await?);
        let mut stats = ScrapeStats::default();

        for (index, source) in verified.into_iter().enumerate() {
            self.reporter
                .publish(
                    report_id,
                    company_id,
                    JobState::Processing,
                    &format!(
                        "Scraping {}... ({}/{})",
                        source.platform.label(),
                        index + 1,
                        total
                    ),
                )
                .await;

            stats.sources_attempted += 1;
            match self.scrape_source(source).await {
                Ok(parsed) => {
                    stats.reviews_parsed += parsed.len() as u32;
                    let fresh = fingerprints.filter_new(parsed);
                    let inserted = self.store.insert_reviews(company_id, &fresh).await?;
                    stats.reviews_new += inserted;
                    info!(
                        platform = %source.platform,
                        url = source.candidate_url,
                        new = inserted,
                        "Source scraped"
                    );
                    stats.outcomes.push(SourceOutcome {
                        source: source.clone(),
                        success: true,
                        review_count: inserted,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(
                        platform = %source.platform,
                        url = source.candidate_url,
                        error = %e,
                        "Source failed"
                    );
                    stats.sources_failed += 1;
                    stats.outcomes.push(SourceOutcome {
                        source: source.clone(),
                        success: false,
                        review_count: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        info!(%company_id, stats = %stats, "Scrape complete");
        Ok(stats)
    }

    /// Fetch and parse one source, following pagination up to the
    /// platform's page cap. Stops early on the first page that parses
    /// to nothing. A first page with zero reviews is a failure: the
    /// source verified earlier, so an empty parse means markup drift.
    async fn scrape_source(&self, source: &ReviewSource) -> anyhow::Result<Vec<ScrapedReview>> {
        let spec = spec_for(source.platform);
        let options = FetchOptions {
            render_js: spec.render_js,
            actions: spec.page_actions.clone(),
            ..Default::default()
        };

        let mut all = Vec::new();
        for page in 1..=spec.page_cap {
            let url = platforms::page_url(source.platform, &source.candidate_url, page);
            // Only the first page is load-bearing; a missing later page
            // just ends pagination.
            let markup = match self.fetcher.fetch(&url, &options).await {
                Ok(markup) => markup,
                Err(e) if page == 1 => return Err(e.into()),
                Err(_) => break,
            };
            let parsed = parse_reviews(source.platform, &markup);
            if parsed.is_empty() {
                break;
            }
            all.extend(parsed);
        }

        if all.is_empty() {
            anyhow::bail!("no reviews parsed from {}", source.candidate_url);
        }
        Ok(all)
    }
}

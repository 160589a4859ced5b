//! The end-to-end report pipeline: one `JobRunner` that discovers
//! sources, scrapes them, analyzes the accumulated corpus, and persists
//! the report document. Progress is published at each phase boundary so
//! a polling client always knows where the job is.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};
use voclens_common::{BusinessContext, Job, JobState, ReportDocument, SourceSummary};

use crate::analysis::{CompletionModel, ReviewAnalyzer};
use crate::orchestrator::{ScrapeOrchestrator, ScrapeStats};
use crate::progress::ProgressReporter;
use crate::queue::JobRunner;
use crate::resolver::SourceResolver;
use crate::store::ReviewStore;

pub struct ReportPipeline<M: CompletionModel> {
    resolver: SourceResolver,
    orchestrator: ScrapeOrchestrator,
    analyzer: ReviewAnalyzer<M>,
    store: Arc<dyn ReviewStore>,
    reporter: Arc<dyn ProgressReporter>,
}

impl<M: CompletionModel> ReportPipeline<M> {
    pub fn new(
        resolver: SourceResolver,
        orchestrator: ScrapeOrchestrator,
        analyzer: ReviewAnalyzer<M>,
        store: Arc<dyn ReviewStore>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            resolver,
            orchestrator,
            analyzer,
            store,
            reporter,
        }
    }

    async fn execute(&self, job: &Job) -> anyhow::Result<()> {
        self.reporter
            .publish(
                job.report_id,
                job.company_id,
                JobState::Processing,
                "Discovering review sources...",
            )
            .await;

        // Regeneration starts from a blank report; stored reviews stay
        // and the new scrape only adds what is missing.
        self.store.clear_report(job.report_id).await?;

        let sources = self
            .resolver
            .resolve(&job.business_name, &job.business_url)
            .await;

        let stats = self
            .orchestrator
            .scrape_all(job.report_id, job.company_id, &sources)
            .await?;

        self.reporter
            .publish(
                job.report_id,
                job.company_id,
                JobState::Processing,
                "Analyzing customer feedback...",
            )
            .await;

        let reviews = self.store.load_reviews(job.company_id).await?;
        let context = BusinessContext {
            name: job.business_name.clone(),
            url: job.business_url.clone(),
            industry: None,
            sources: source_summaries(&stats),
        };
        let report = self.analyzer.analyze(&context, &reviews).await?;

        let document = ReportDocument {
            report,
            sources: context.sources,
        };
        self.store
            .save_report(job.report_id, job.company_id, &document)
            .await?;

        self.reporter
            .publish(
                job.report_id,
                job.company_id,
                JobState::Completed,
                "Analysis complete",
            )
            .await;

        info!(job_id = %job.id, total_reviews = reviews.len(), "Report saved");
        Ok(())
    }
}

#[async_trait]
impl<M: CompletionModel> JobRunner for ReportPipeline<M> {
    async fn run(&self, job: &Job) -> anyhow::Result<()> {
        match self.execute(job).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Report generation failed");
                self.reporter
                    .publish(
                        job.report_id,
                        job.company_id,
                        JobState::Failed,
                        &format!("Report generation failed: {e}"),
                    )
                    .await;
                Err(e)
            }
        }
    }
}

fn source_summaries(stats: &ScrapeStats) -> Vec<SourceSummary> {
    let now = Utc::now();
    stats
        .outcomes
        .iter()
        .filter(|o| o.success)
        .map(|o| SourceSummary {
            platform: o.source.platform,
            url: o.source.candidate_url.clone(),
            review_count: o.review_count,
            last_sync: now,
        })
        .collect()
}

//! End-to-end pipeline tests over in-memory fakes: a stubbed fetcher,
//! a scripted model, and the memory store. No network, no Postgres.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;
use voclens_common::{EnqueueRequest, Job, Platform, ScrapedReview};

use voclens_engine::analysis::{CompletionModel, ReviewAnalyzer};
use voclens_engine::fetcher::FakeFetcher;
use voclens_engine::orchestrator::ScrapeOrchestrator;
use voclens_engine::pipeline::ReportPipeline;
use voclens_engine::progress::StoreReporter;
use voclens_engine::queue::JobRunner;
use voclens_engine::resolver::{SourceResolver, UrlDiscoverer};
use voclens_engine::store::{MemStore, ReviewStore};

const VALID_RESPONSE: &str = r#"{
    "executiveSummary": "Customers praise reliability but want better pricing.",
    "keyInsights": ["Reliability is the top theme"],
    "sentimentOverTime": [{"period": "2026-06", "positive": 2, "neutral": 0, "negative": 0}],
    "mentionsByTopic": [{"topic": "reliability", "mentions": 2, "positive": 2, "negative": 0}],
    "trendingTopics": ["reliability"],
    "marketGaps": ["Cheaper entry tier"],
    "advancedMetrics": {"totalReviews": 2, "averageRating": 4.5, "sentimentScore": 0.7, "reviewVelocityPerMonth": 1.0},
    "suggestedActions": ["Introduce a starter plan"]
}"#;

/// Trustpilot page with three structured reviews, two of them identical.
const TRUSTPILOT_MARKUP: &str = r#"
    <html><body>
    <h1>Acme reviews</h1>
    <script type="application/ld+json">
    {"@graph": [
        {"@type": "Review", "author": {"name": "Ana"}, "datePublished": "2026-06-01",
         "reviewBody": "Acme has been rock solid for our team all year.",
         "reviewRating": {"ratingValue": 5}},
        {"@type": "Review", "author": {"name": "Ben"}, "datePublished": "2026-06-10",
         "reviewBody": "Good product overall though the pricing stings a bit.",
         "reviewRating": {"ratingValue": 4}},
        {"@type": "Review", "author": {"name": "Ana"}, "datePublished": "2026-06-01",
         "reviewBody": "Acme has been rock solid for our team all year.",
         "reviewRating": {"ratingValue": 5}}
    ]}
    </script>
    </body></html>
"#;

struct ScriptedModel {
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

/// Local handle around the scripted model so tests keep a counting
/// reference while the analyzer owns its copy.
#[derive(Clone)]
struct SharedModel(Arc<ScriptedModel>);

#[async_trait]
impl CompletionModel for SharedModel {
    async fn complete(&self, _system: &str, user: &str, _temperature: f32) -> anyhow::Result<String> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        self.0.prompts.lock().unwrap().push(user.to_string());
        self.0
            .responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| anyhow::anyhow!("no scripted response left"))
    }
}

struct NoDiscovery;

#[async_trait]
impl UrlDiscoverer for NoDiscovery {
    async fn discover(
        &self,
        _platform: Platform,
        _business_name: &str,
        _domain: &str,
    ) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

fn pipeline(
    fetcher: Arc<FakeFetcher>,
    store: Arc<MemStore>,
    model: Arc<ScriptedModel>,
) -> ReportPipeline<SharedModel> {
    let store: Arc<dyn ReviewStore> = store;
    let reporter = Arc::new(StoreReporter::new(store.clone()));
    ReportPipeline::new(
        SourceResolver::new(fetcher.clone(), Arc::new(NoDiscovery)),
        ScrapeOrchestrator::new(fetcher, store.clone(), reporter.clone()),
        ReviewAnalyzer::new(SharedModel(model)),
        store,
        reporter,
    )
}

fn job() -> Job {
    Job::new(EnqueueRequest {
        company_id: Uuid::new_v4(),
        report_id: Uuid::new_v4(),
        business_name: "Acme".to_string(),
        business_url: "https://acme.example".to_string(),
    })
}

#[tokio::test]
async fn full_run_scrapes_dedupes_and_saves_a_report() {
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.stub(
        "https://www.trustpilot.com/review/acme.example",
        TRUSTPILOT_MARKUP,
    );
    let store = Arc::new(MemStore::new());
    let model = Arc::new(ScriptedModel::new(vec![VALID_RESPONSE]));
    let pipeline = pipeline(fetcher, store.clone(), model);

    let job = job();
    pipeline.run(&job).await.unwrap();

    // Three parsed, one duplicate dropped.
    assert_eq!(store.review_count(job.company_id), 2);
    assert!(store.report_ready(job.report_id).await.unwrap());

    let document = store.load_report(job.report_id).await.unwrap().unwrap();
    assert_eq!(document.sources.len(), 1);
    assert_eq!(document.sources[0].platform, Platform::Trustpilot);
    assert_eq!(document.sources[0].review_count, 2);
    assert_eq!(
        store
            .progress_message(job.report_id)
            .await
            .unwrap()
            .as_deref(),
        Some("Analysis complete")
    );
}

#[tokio::test]
async fn rerun_adds_no_reviews_but_regenerates_the_report() {
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.stub(
        "https://www.trustpilot.com/review/acme.example",
        TRUSTPILOT_MARKUP,
    );
    let store = Arc::new(MemStore::new());
    let model = Arc::new(ScriptedModel::new(vec![VALID_RESPONSE, VALID_RESPONSE]));
    let pipeline = pipeline(fetcher, store.clone(), model);

    let job = job();
    pipeline.run(&job).await.unwrap();
    pipeline.run(&job).await.unwrap();

    assert_eq!(store.review_count(job.company_id), 2);
    assert!(store.report_ready(job.report_id).await.unwrap());
}

#[tokio::test]
async fn analysis_covers_the_whole_stored_corpus_not_just_this_sync() {
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.stub(
        "https://www.trustpilot.com/review/acme.example",
        TRUSTPILOT_MARKUP,
    );
    let store = Arc::new(MemStore::new());
    let model = Arc::new(ScriptedModel::new(vec![VALID_RESPONSE]));
    let pipeline = pipeline(fetcher, store.clone(), model.clone());

    let job = job();
    // A review from an earlier sync, not present on the scraped page.
    let prior = ScrapedReview::new(
        Platform::Yelp,
        None,
        Some("Cleo".to_string()),
        Some(3),
        "Earlier sync found this review on a different platform.".to_string(),
        None,
    );
    store.insert_reviews(job.company_id, &[prior]).await.unwrap();

    pipeline.run(&job).await.unwrap();

    // This sync adds 2 of 3 scraped (1 duplicate), on top of the prior 1.
    assert_eq!(store.review_count(job.company_id), 3);
    let document = store.load_report(job.report_id).await.unwrap().unwrap();
    assert_eq!(document.sources[0].review_count, 2);

    // The report is regenerated over everything stored, prior syncs included.
    let prompt = model.last_prompt();
    assert!(prompt.contains("Total reviews: 3"));
    assert!(prompt.contains("Earlier sync found this review"));
}

#[tokio::test]
async fn schema_violation_fails_the_job_and_stores_no_report() {
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.stub(
        "https://www.trustpilot.com/review/acme.example",
        TRUSTPILOT_MARKUP,
    );
    let store = Arc::new(MemStore::new());
    // Valid JSON, but missing most required report keys.
    let model = Arc::new(ScriptedModel::new(vec![
        r#"{"executiveSummary": "Looks fine"}"#,
    ]));
    let pipeline = pipeline(fetcher, store.clone(), model);

    let job = job();
    let err = pipeline.run(&job).await.unwrap_err();
    assert!(err.to_string().contains("mentionsByTopic"));
    assert!(!store.report_ready(job.report_id).await.unwrap());
    assert!(store
        .progress_message(job.report_id)
        .await
        .unwrap()
        .unwrap()
        .starts_with("Report generation failed"));
}

#[tokio::test]
async fn business_with_no_sources_completes_with_a_no_data_report() {
    // Nothing stubbed: every candidate fetch fails, no source verifies.
    let fetcher = Arc::new(FakeFetcher::new());
    let store = Arc::new(MemStore::new());
    let model = Arc::new(ScriptedModel::new(vec![]));
    let pipeline = pipeline(fetcher, store.clone(), model.clone());

    let job = job();
    pipeline.run(&job).await.unwrap();

    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    let document = store.load_report(job.report_id).await.unwrap().unwrap();
    assert_eq!(document.report.advanced_metrics.total_reviews, 0);
    assert!(document.sources.is_empty());
}

#[tokio::test]
async fn one_dead_platform_does_not_block_the_others() {
    let fetcher = Arc::new(FakeFetcher::new());
    // Trustpilot works, Yelp candidate exists but serves an error page.
    fetcher.stub(
        "https://www.trustpilot.com/review/acme.example",
        TRUSTPILOT_MARKUP,
    );
    let store = Arc::new(MemStore::new());
    let model = Arc::new(ScriptedModel::new(vec![VALID_RESPONSE]));
    let pipeline = pipeline(fetcher, store.clone(), model);

    let job = job();
    pipeline.run(&job).await.unwrap();

    assert_eq!(store.review_count(job.company_id), 2);
    let document = store.load_report(job.report_id).await.unwrap().unwrap();
    assert!(document
        .sources
        .iter()
        .all(|s| s.platform == Platform::Trustpilot));
}

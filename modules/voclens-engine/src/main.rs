use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voclens_common::Config;
use voclens_engine::analysis::ReviewAnalyzer;
use voclens_engine::fetcher::{BrowserlessFetcher, PageFetcher};
use voclens_engine::orchestrator::ScrapeOrchestrator;
use voclens_engine::pipeline::ReportPipeline;
use voclens_engine::progress::{ProgressReporter, StoreReporter};
use voclens_engine::queue::JobQueue;
use voclens_engine::resolver::{ClaudeDiscoverer, SourceResolver};
use voclens_engine::server::{router, AppState};
use voclens_engine::store::{PgStore, ReviewStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("voclens=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let pg_store = PgStore::new(pool);
    pg_store.migrate().await?;
    let store: Arc<dyn ReviewStore> = Arc::new(pg_store);

    let claude = ai_client::Claude::new(&config.anthropic_api_key, &config.anthropic_model);
    let fetcher: Arc<dyn PageFetcher> = Arc::new(BrowserlessFetcher::new(
        &config.browserless_url,
        config.browserless_token.as_deref(),
    ));
    let reporter: Arc<dyn ProgressReporter> = Arc::new(StoreReporter::new(store.clone()));

    let pipeline = ReportPipeline::new(
        SourceResolver::new(fetcher.clone(), Arc::new(ClaudeDiscoverer::new(claude.clone()))),
        ScrapeOrchestrator::new(fetcher, store.clone(), reporter.clone()),
        ReviewAnalyzer::new(claude),
        store.clone(),
        reporter,
    );

    let queue = JobQueue::new();
    let worker = queue.start(Arc::new(pipeline));

    let app = router(AppState {
        queue: queue.clone(),
        store,
    })
    .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.bind_host, config.bind_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    queue.shutdown();
    worker.await?;
    Ok(())
}

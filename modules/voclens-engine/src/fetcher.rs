use std::time::Duration;

use async_trait::async_trait;
use browserless_client::{BrowserlessClient, ContentOptions, PageAction, BROWSER_USER_AGENT};
use tracing::{info, warn};
use voclens_common::FetchError;

use crate::platforms::FETCH_TIMEOUT;

/// Per-fetch options derived from the platform spec.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub render_js: bool,
    pub timeout: Duration,
    pub actions: Vec<PageAction>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            render_js: false,
            timeout: FETCH_TIMEOUT,
            actions: Vec::new(),
        }
    }
}

/// One HTTP(S) retrieval of a URL. No retries here — the orchestrator
/// attempts each source once per job to bound total job latency.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError>;
    fn name(&self) -> &str;
}

/// Fetcher that routes JS-heavy pages through a Browserless rendering
/// service and everything else through plain reqwest, both with a
/// browser user agent and a hard timeout.
pub struct BrowserlessFetcher {
    rendering: BrowserlessClient,
    http: reqwest::Client,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        info!(base_url, "Using BrowserlessFetcher");
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            rendering: BrowserlessClient::new(base_url, token),
            http,
        }
    }

    async fn fetch_rendered(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        let content_options = ContentOptions {
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: options.timeout,
            actions: options.actions.clone(),
        };
        self.rendering
            .content(url, &content_options)
            .await
            .map_err(|e| match e {
                browserless_client::BrowserlessError::Timeout { timeout_ms } => {
                    FetchError::Timeout { timeout_ms }
                }
                browserless_client::BrowserlessError::Api { status, .. } => {
                    FetchError::Http { status }
                }
                browserless_client::BrowserlessError::Network(msg) => FetchError::Network(msg),
            })
    }

    async fn fetch_plain(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        timeout_ms: options.timeout.as_millis() as u64,
                    }
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        let result = if options.render_js {
            self.fetch_rendered(url, options).await
        } else {
            self.fetch_plain(url, options).await
        };

        match &result {
            Ok(markup) => info!(url, bytes = markup.len(), rendered = options.render_js, "Fetched"),
            Err(e) => warn!(url, error = %e, "Fetch failed"),
        }
        result
    }

    fn name(&self) -> &str {
        "browserless"
    }
}

/// Canned-response fetcher for tests. Unstubbed URLs return a network
/// error, which is how tests simulate a dead source.
#[derive(Default)]
pub struct FakeFetcher {
    pages: std::sync::Mutex<std::collections::HashMap<String, String>>,
    fetches: std::sync::atomic::AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stub(&self, url: &str, markup: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), markup.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<String, FetchError> {
        self.fetches
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("no stub for {url}")))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

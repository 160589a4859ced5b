use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fingerprint::review_fingerprint;

// --- Platforms ---

/// Closed set of review platforms the pipeline knows how to scrape.
/// `Generic` is the fallback for pages that match no known platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Trustpilot,
    Capterra,
    Reddit,
    Yelp,
    Generic,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Trustpilot => "trustpilot",
            Platform::Capterra => "capterra",
            Platform::Reddit => "reddit",
            Platform::Yelp => "yelp",
            Platform::Generic => "generic",
        }
    }

    /// Human-readable name used in progress messages.
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Trustpilot => "Trustpilot",
            Platform::Capterra => "Capterra",
            Platform::Reddit => "Reddit",
            Platform::Yelp => "Yelp",
            Platform::Generic => "the web",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Jobs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Processing => write!(f, "processing"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// One end-to-end discovery → scrape → analyze execution for a business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub company_id: Uuid,
    pub report_id: Uuid,
    pub business_name: String,
    pub business_url: String,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(request: EnqueueRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id: request.company_id,
            report_id: request.report_id,
            business_name: request.business_name,
            business_url: request.business_url,
            state: JobState::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}

/// What the external caller sends to enqueue a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub company_id: Uuid,
    pub report_id: Uuid,
    pub business_name: String,
    pub business_url: String,
}

/// What a polling client reads back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: JobState,
    pub progress_message: String,
    pub analysis_ready: bool,
}

// --- Sources & reviews ---

/// A candidate page believed to host reviews of the business.
/// Unverified candidates are kept for observability but never scraped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSource {
    pub platform: Platform,
    pub candidate_url: String,
    pub verified: bool,
    pub estimated_count: u32,
}

/// A single normalized review produced by a parser. Immutable once built;
/// the fingerprint is the dedup key (`external_id` is best-effort only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedReview {
    pub source_platform: Platform,
    pub external_id: Option<String>,
    pub reviewer_name: Option<String>,
    pub rating: Option<u8>,
    pub text: String,
    pub date: Option<NaiveDate>,
    pub fingerprint: String,
}

impl ScrapedReview {
    pub fn new(
        source_platform: Platform,
        external_id: Option<String>,
        reviewer_name: Option<String>,
        rating: Option<u8>,
        text: String,
        date: Option<NaiveDate>,
    ) -> Self {
        let fingerprint = review_fingerprint(&text, reviewer_name.as_deref(), date);
        Self {
            source_platform,
            external_id,
            reviewer_name,
            rating: rating.map(|r| r.clamp(1, 5)),
            text,
            date,
            fingerprint,
        }
    }
}

/// Per-source summary attached to the persisted report document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub platform: Platform,
    pub url: String,
    pub review_count: u32,
    pub last_sync: DateTime<Utc>,
}

/// Business context handed to the analysis step alongside the corpus.
#[derive(Debug, Clone)]
pub struct BusinessContext {
    pub name: String,
    pub url: String,
    pub industry: Option<String>,
    pub sources: Vec<SourceSummary>,
}

// --- Analysis report ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SentimentPoint {
    /// Period label, e.g. "2026-07" or "Q2 2026".
    pub period: String,
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicMentions {
    pub topic: String,
    pub mentions: u32,
    pub positive: u32,
    pub negative: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedMetrics {
    pub total_reviews: u32,
    pub average_rating: Option<f32>,
    /// Overall sentiment in [-1.0, 1.0].
    pub sentiment_score: f32,
    pub review_velocity_per_month: Option<f32>,
}

/// The validated Voice-of-Customer report. Every field maps to a required
/// top-level key in the model's JSON response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub executive_summary: String,
    pub key_insights: Vec<String>,
    pub sentiment_over_time: Vec<SentimentPoint>,
    pub mentions_by_topic: Vec<TopicMentions>,
    pub trending_topics: Vec<String>,
    pub market_gaps: Vec<String>,
    pub advanced_metrics: AdvancedMetrics,
    pub suggested_actions: Vec<String>,
}

impl AnalysisReport {
    /// Top-level keys that must be present in the model response.
    pub const REQUIRED_KEYS: [&'static str; 8] = [
        "executiveSummary",
        "keyInsights",
        "sentimentOverTime",
        "mentionsByTopic",
        "trendingTopics",
        "marketGaps",
        "advancedMetrics",
        "suggestedActions",
    ];
}

/// The full persisted report document read by the excluded UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub report: AnalysisReport,
    pub sources: Vec<SourceSummary>,
}

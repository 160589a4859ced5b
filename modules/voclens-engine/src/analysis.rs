//! Review analysis: hand the full corpus plus business context to the
//! hosted model and validate the JSON that comes back before anything
//! is persisted. A response missing required keys fails the job rather
//! than storing a partial report.

use async_trait::async_trait;
use tracing::info;
use voclens_common::{AnalysisReport, BusinessContext, ScrapedReview, VocLensError};

/// Low temperature keeps the report structure stable across runs.
const ANALYSIS_TEMPERATURE: f32 = 0.2;

/// Corpus character budget sent to the model. Oldest reviews are dropped
/// first when the corpus exceeds it.
const MAX_CORPUS_CHARS: usize = 120_000;

/// Per-review cap inside the prompt, so one essay-length review cannot
/// crowd out the rest of the corpus.
const MAX_REVIEW_CHARS: usize = 2_000;

/// System prompt with the report contract rendered from the report type
/// itself, so the schema the model is told about can never drift from
/// the one validation enforces.
fn analysis_system_prompt() -> String {
    let schema = schemars::schema_for!(AnalysisReport);
    let schema_json =
        serde_json::to_string_pretty(&schema).expect("report schema serializes");
    format!(
        "You are a Voice-of-Customer analyst. You receive a corpus of customer \
         reviews for one business and produce a single JSON object, with no \
         surrounding prose, conforming to this JSON Schema:\n\n{schema_json}\n\n\
         Use period labels like \"2026-07\" in sentimentOverTime, keep \
         sentimentScore within [-1, 1], and base every figure on the corpus \
         you are given. Reply with the JSON object only."
    )
}

/// Seam over the hosted model so tests can script responses.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str, temperature: f32) -> anyhow::Result<String>;
}

#[async_trait]
impl CompletionModel for ai_client::Claude {
    async fn complete(&self, system: &str, user: &str, temperature: f32) -> anyhow::Result<String> {
        self.chat_completion(system, user, temperature).await
    }
}

pub struct ReviewAnalyzer<M: CompletionModel> {
    model: M,
    system_prompt: String,
}

impl<M: CompletionModel> ReviewAnalyzer<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            system_prompt: analysis_system_prompt(),
        }
    }

    pub async fn analyze(
        &self,
        context: &BusinessContext,
        reviews: &[ScrapedReview],
    ) -> Result<AnalysisReport, VocLensError> {
        if reviews.is_empty() {
            info!(business = context.name, "Empty corpus, skipping model call");
            return Ok(no_data_report());
        }

        let user_prompt = build_corpus_prompt(context, reviews);
        let response = self
            .model
            .complete(&self.system_prompt, &user_prompt, ANALYSIS_TEMPERATURE)
            .await
            .map_err(|e| VocLensError::ModelCall(e.to_string()))?;

        let report = validate_report(&response)?;
        info!(
            business = context.name,
            reviews = reviews.len(),
            insights = report.key_insights.len(),
            "Analysis complete"
        );
        Ok(report)
    }
}

fn build_corpus_prompt(context: &BusinessContext, reviews: &[ScrapedReview]) -> String {
    let mut prompt = format!("Business: {}\nWebsite: {}\n", context.name, context.url);
    if let Some(industry) = &context.industry {
        prompt.push_str(&format!("Industry: {industry}\n"));
    }
    prompt.push_str(&format!("Total reviews: {}\n\nReviews:\n", reviews.len()));

    // Newest first so truncation drops the oldest reviews.
    let mut ordered: Vec<&ScrapedReview> = reviews.iter().collect();
    ordered.sort_by(|a, b| b.date.cmp(&a.date));

    for review in ordered {
        let mut line = format!("- [{}]", review.source_platform.label());
        if let Some(date) = review.date {
            line.push_str(&format!(" ({date})"));
        }
        if let Some(rating) = review.rating {
            line.push_str(&format!(" {rating}/5"));
        }
        if let Some(name) = &review.reviewer_name {
            line.push_str(&format!(" {name}:"));
        }
        line.push(' ');
        line.push_str(ai_client::truncate_to_char_boundary(
            &review.text,
            MAX_REVIEW_CHARS,
        ));
        line.push('\n');

        if prompt.len() + line.len() > MAX_CORPUS_CHARS {
            break;
        }
        prompt.push_str(&line);
    }
    prompt
}

/// Parse and validate the model response: strip code fences, require all
/// report keys, then deserialize into the typed report.
fn validate_report(response: &str) -> Result<AnalysisReport, VocLensError> {
    let stripped = ai_client::strip_code_blocks(response);
    let value: serde_json::Value = serde_json::from_str(&stripped)
        .map_err(|e| VocLensError::ModelCall(format!("response is not valid JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| VocLensError::AnalysisSchema("response is not a JSON object".to_string()))?;
    let missing: Vec<&str> = AnalysisReport::REQUIRED_KEYS
        .into_iter()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(VocLensError::AnalysisSchema(format!(
            "missing required keys: {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value(value).map_err(|e| VocLensError::AnalysisSchema(e.to_string()))
}

/// Report written when a business has no reviews anywhere. The job still
/// completes; the report says so instead of failing.
fn no_data_report() -> AnalysisReport {
    AnalysisReport {
        executive_summary: "No customer reviews were found for this business on any supported \
                            platform."
            .to_string(),
        key_insights: vec![],
        sentiment_over_time: vec![],
        mentions_by_topic: vec![],
        trending_topics: vec![],
        market_gaps: vec![],
        advanced_metrics: voclens_common::AdvancedMetrics {
            total_reviews: 0,
            average_rating: None,
            sentiment_score: 0.0,
            review_velocity_per_month: None,
        },
        suggested_actions: vec![
            "Encourage customers to leave reviews on Trustpilot or other platforms.".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use voclens_common::Platform;

    pub(crate) struct ScriptedModel {
        responses: Mutex<Vec<String>>,
        pub calls: std::sync::atomic::AtomicUsize,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _temperature: f32,
        ) -> anyhow::Result<String> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| anyhow::anyhow!("no scripted response left"))
        }
    }

    fn context() -> BusinessContext {
        BusinessContext {
            name: "Acme".to_string(),
            url: "https://acme.example".to_string(),
            industry: None,
            sources: vec![],
        }
    }

    fn review(text: &str) -> ScrapedReview {
        ScrapedReview::new(Platform::Generic, None, None, Some(4), text.to_string(), None)
    }

    pub(crate) const VALID_RESPONSE: &str = r#"{
        "executiveSummary": "Customers are broadly satisfied.",
        "keyInsights": ["Support is fast"],
        "sentimentOverTime": [{"period": "2026-07", "positive": 3, "neutral": 1, "negative": 0}],
        "mentionsByTopic": [{"topic": "support", "mentions": 4, "positive": 3, "negative": 1}],
        "trendingTopics": ["support"],
        "marketGaps": ["No mobile app"],
        "advancedMetrics": {"totalReviews": 4, "averageRating": 4.2, "sentimentScore": 0.6, "reviewVelocityPerMonth": 2.0},
        "suggestedActions": ["Ship a mobile app"]
    }"#;

    #[tokio::test]
    async fn valid_response_parses_even_inside_code_fences() {
        let fenced = format!("```json\n{VALID_RESPONSE}\n```");
        let analyzer = ReviewAnalyzer::new(ScriptedModel::new(vec![&fenced]));
        let report = analyzer
            .analyze(&context(), &[review("Support replied in minutes, love it.")])
            .await
            .unwrap();
        assert_eq!(report.key_insights, vec!["Support is fast"]);
        assert_eq!(report.advanced_metrics.total_reviews, 4);
    }

    #[tokio::test]
    async fn missing_key_is_a_schema_error() {
        let mut value: serde_json::Value = serde_json::from_str(VALID_RESPONSE).unwrap();
        value.as_object_mut().unwrap().remove("mentionsByTopic");
        let analyzer = ReviewAnalyzer::new(ScriptedModel::new(vec![&value.to_string()]));

        let err = analyzer
            .analyze(&context(), &[review("A review long enough to analyze.")])
            .await
            .unwrap_err();
        assert!(matches!(err, VocLensError::AnalysisSchema(_)));
        assert!(err.to_string().contains("mentionsByTopic"));
    }

    #[tokio::test]
    async fn non_json_response_is_a_model_error() {
        let analyzer =
            ReviewAnalyzer::new(ScriptedModel::new(vec!["Sorry, I cannot help with that."]));
        let err = analyzer
            .analyze(&context(), &[review("A review long enough to analyze.")])
            .await
            .unwrap_err();
        assert!(matches!(err, VocLensError::ModelCall(_)));
    }

    #[tokio::test]
    async fn empty_corpus_skips_the_model() {
        let model = ScriptedModel::new(vec![]);
        let analyzer = ReviewAnalyzer::new(model);
        let report = analyzer.analyze(&context(), &[]).await.unwrap();
        assert_eq!(report.advanced_metrics.total_reviews, 0);
        assert_eq!(
            analyzer
                .model
                .calls
                .load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[test]
    fn system_prompt_schema_names_every_required_key() {
        let prompt = analysis_system_prompt();
        for key in AnalysisReport::REQUIRED_KEYS {
            assert!(prompt.contains(key), "schema missing {key}");
        }
    }

    #[test]
    fn oversized_reviews_are_capped_not_dominant() {
        let huge = review(&"y".repeat(50_000));
        let small = review("A short review that must survive.");
        let prompt = build_corpus_prompt(&context(), &[huge, small]);
        assert!(prompt.contains("A short review that must survive."));
        assert!(prompt.len() < MAX_REVIEW_CHARS + 500);
    }

    #[test]
    fn corpus_prompt_is_bounded() {
        let reviews: Vec<ScrapedReview> = (0..5000)
            .map(|i| review(&format!("Review {i}: {}", "x".repeat(100))))
            .collect();
        let prompt = build_corpus_prompt(&context(), &reviews);
        assert!(prompt.len() <= MAX_CORPUS_CHARS + 200);
    }
}

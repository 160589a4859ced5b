//! Persistence. Reviews are append-only per company with a fingerprint
//! uniqueness constraint; the report row doubles as the progress record
//! a polling client reads while the job runs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use voclens_common::{JobState, Platform, ReportDocument, ScrapedReview};

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// All fingerprints already stored for this company.
    async fn load_fingerprints(&self, company_id: Uuid) -> anyhow::Result<HashSet<String>>;

    /// Insert a batch, skipping fingerprints that already exist. Returns
    /// the number of rows actually written.
    async fn insert_reviews(
        &self,
        company_id: Uuid,
        reviews: &[ScrapedReview],
    ) -> anyhow::Result<u32>;

    /// Full corpus for this company, oldest review date first.
    async fn load_reviews(&self, company_id: Uuid) -> anyhow::Result<Vec<ScrapedReview>>;

    async fn save_report(
        &self,
        report_id: Uuid,
        company_id: Uuid,
        document: &ReportDocument,
    ) -> anyhow::Result<()>;

    /// Drop the stored document ahead of regeneration so readers never
    /// see a stale report presented as fresh.
    async fn clear_report(&self, report_id: Uuid) -> anyhow::Result<()>;

    async fn load_report(&self, report_id: Uuid) -> anyhow::Result<Option<ReportDocument>>;

    async fn report_ready(&self, report_id: Uuid) -> anyhow::Result<bool>;

    /// Upsert the progress row for a report. Called on every state
    /// transition so a polling client always has something to show.
    async fn set_progress(
        &self,
        report_id: Uuid,
        company_id: Uuid,
        state: JobState,
        message: &str,
    ) -> anyhow::Result<()>;

    async fn progress_message(&self, report_id: Uuid) -> anyhow::Result<Option<String>>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn platform_from_str(s: &str) -> Platform {
    match s {
        "trustpilot" => Platform::Trustpilot,
        "capterra" => Platform::Capterra,
        "reddit" => Platform::Reddit,
        "yelp" => Platform::Yelp,
        _ => Platform::Generic,
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn load_fingerprints(&self, company_id: Uuid) -> anyhow::Result<HashSet<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT fingerprint FROM reviews WHERE company_id = $1")
                .bind(company_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(f,)| f).collect())
    }

    async fn insert_reviews(
        &self,
        company_id: Uuid,
        reviews: &[ScrapedReview],
    ) -> anyhow::Result<u32> {
        let mut inserted = 0u32;
        for review in reviews {
            let result = sqlx::query(
                r#"
                INSERT INTO reviews
                    (company_id, platform, external_id, reviewer_name, rating, text, review_date, fingerprint)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (company_id, fingerprint) DO NOTHING
                "#,
            )
            .bind(company_id)
            .bind(review.source_platform.as_str())
            .bind(&review.external_id)
            .bind(&review.reviewer_name)
            .bind(review.rating.map(i16::from))
            .bind(&review.text)
            .bind(review.date)
            .bind(&review.fingerprint)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected() as u32;
        }
        Ok(inserted)
    }

    async fn load_reviews(&self, company_id: Uuid) -> anyhow::Result<Vec<ScrapedReview>> {
        #[derive(sqlx::FromRow)]
        struct Row {
            platform: String,
            external_id: Option<String>,
            reviewer_name: Option<String>,
            rating: Option<i16>,
            text: String,
            review_date: Option<chrono::NaiveDate>,
            fingerprint: String,
        }

        let rows: Vec<Row> = sqlx::query_as(
            r#"
            SELECT platform, external_id, reviewer_name, rating, text, review_date, fingerprint
            FROM reviews
            WHERE company_id = $1
            ORDER BY review_date ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ScrapedReview {
                source_platform: platform_from_str(&r.platform),
                external_id: r.external_id,
                reviewer_name: r.reviewer_name,
                rating: r.rating.map(|v| v as u8),
                text: r.text,
                date: r.review_date,
                fingerprint: r.fingerprint,
            })
            .collect())
    }

    async fn save_report(
        &self,
        report_id: Uuid,
        company_id: Uuid,
        document: &ReportDocument,
    ) -> anyhow::Result<()> {
        let json = serde_json::to_value(document)?;
        sqlx::query(
            r#"
            INSERT INTO reports (report_id, company_id, document, state, analysis_ready, updated_at)
            VALUES ($1, $2, $3, 'completed', TRUE, NOW())
            ON CONFLICT (report_id) DO UPDATE
            SET document = EXCLUDED.document,
                state = 'completed',
                analysis_ready = TRUE,
                updated_at = NOW()
            "#,
        )
        .bind(report_id)
        .bind(company_id)
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_report(&self, report_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE reports SET document = NULL, analysis_ready = FALSE, updated_at = NOW() \
             WHERE report_id = $1",
        )
        .bind(report_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_report(&self, report_id: Uuid) -> anyhow::Result<Option<ReportDocument>> {
        let row: Option<(Option<serde_json::Value>,)> =
            sqlx::query_as("SELECT document FROM reports WHERE report_id = $1")
                .bind(report_id)
                .fetch_optional(&self.pool)
                .await?;
        match row.and_then(|(doc,)| doc) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn report_ready(&self, report_id: Uuid) -> anyhow::Result<bool> {
        let row: Option<(bool,)> =
            sqlx::query_as("SELECT analysis_ready FROM reports WHERE report_id = $1")
                .bind(report_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(ready,)| ready).unwrap_or(false))
    }

    async fn set_progress(
        &self,
        report_id: Uuid,
        company_id: Uuid,
        state: JobState,
        message: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (report_id, company_id, state, progress_message, analysis_ready, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW())
            ON CONFLICT (report_id) DO UPDATE
            SET state = EXCLUDED.state,
                progress_message = EXCLUDED.progress_message,
                updated_at = NOW()
            "#,
        )
        .bind(report_id)
        .bind(company_id)
        .bind(state.to_string())
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn progress_message(&self, report_id: Uuid) -> anyhow::Result<Option<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT progress_message FROM reports WHERE report_id = $1")
                .bind(report_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(m,)| m))
    }
}

/// In-memory store used by tests and local dry runs.
#[derive(Default)]
pub struct MemStore {
    inner: std::sync::Mutex<MemInner>,
}

#[derive(Default)]
struct MemInner {
    reviews: HashMap<Uuid, Vec<ScrapedReview>>,
    reports: HashMap<Uuid, ReportRow>,
}

#[derive(Clone)]
struct ReportRow {
    document: Option<ReportDocument>,
    progress_message: Option<String>,
    analysis_ready: bool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn review_count(&self, company_id: Uuid) -> usize {
        self.inner
            .lock()
            .unwrap()
            .reviews
            .get(&company_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ReviewStore for MemStore {
    async fn load_fingerprints(&self, company_id: Uuid) -> anyhow::Result<HashSet<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .reviews
            .get(&company_id)
            .map(|rows| rows.iter().map(|r| r.fingerprint.clone()).collect())
            .unwrap_or_default())
    }

    async fn insert_reviews(
        &self,
        company_id: Uuid,
        reviews: &[ScrapedReview],
    ) -> anyhow::Result<u32> {
        let mut inner = self.inner.lock().unwrap();
        let rows = inner.reviews.entry(company_id).or_default();
        let mut inserted = 0u32;
        for review in reviews {
            if rows.iter().all(|r| r.fingerprint != review.fingerprint) {
                rows.push(review.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn load_reviews(&self, company_id: Uuid) -> anyhow::Result<Vec<ScrapedReview>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .reviews
            .get(&company_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_report(
        &self,
        report_id: Uuid,
        _company_id: Uuid,
        document: &ReportDocument,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner.reports.entry(report_id).or_insert_with(|| ReportRow {
            document: None,
            progress_message: None,
            analysis_ready: false,
        });
        row.document = Some(document.clone());
        row.analysis_ready = true;
        Ok(())
    }

    async fn clear_report(&self, report_id: Uuid) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(row) = inner.reports.get_mut(&report_id) {
            row.document = None;
            row.analysis_ready = false;
        }
        Ok(())
    }

    async fn load_report(&self, report_id: Uuid) -> anyhow::Result<Option<ReportDocument>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .reports
            .get(&report_id)
            .and_then(|row| row.document.clone()))
    }

    async fn report_ready(&self, report_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .reports
            .get(&report_id)
            .map(|row| row.analysis_ready)
            .unwrap_or(false))
    }

    async fn set_progress(
        &self,
        report_id: Uuid,
        _company_id: Uuid,
        _state: JobState,
        message: &str,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner.reports.entry(report_id).or_insert_with(|| ReportRow {
            document: None,
            progress_message: None,
            analysis_ready: false,
        });
        row.progress_message = Some(message.to_string());
        Ok(())
    }

    async fn progress_message(&self, report_id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .reports
            .get(&report_id)
            .and_then(|row| row.progress_message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(text: &str) -> ScrapedReview {
        ScrapedReview::new(Platform::Generic, None, None, None, text.to_string(), None)
    }

    #[tokio::test]
    async fn mem_store_skips_duplicate_fingerprints() {
        let store = MemStore::new();
        let company = Uuid::new_v4();
        let batch = vec![review("Stable review text"), review("Another review text")];

        assert_eq!(store.insert_reviews(company, &batch).await.unwrap(), 2);
        assert_eq!(store.insert_reviews(company, &batch).await.unwrap(), 0);
        assert_eq!(store.review_count(company), 2);
    }

    #[tokio::test]
    async fn clear_report_resets_readiness() {
        let store = MemStore::new();
        let report_id = Uuid::new_v4();
        let company = Uuid::new_v4();

        store
            .set_progress(report_id, company, JobState::Processing, "working")
            .await
            .unwrap();
        assert!(!store.report_ready(report_id).await.unwrap());
        assert_eq!(
            store.progress_message(report_id).await.unwrap().as_deref(),
            Some("working")
        );

        store.clear_report(report_id).await.unwrap();
        assert!(store.load_report(report_id).await.unwrap().is_none());
    }
}

//! HTTP surface: enqueue a job, poll its status, read the finished
//! report. Thin by intent — all behavior lives in the pipeline.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use voclens_common::{EnqueueRequest, Job, JobStatus};

use crate::queue::JobQueue;
use crate::store::ReviewStore;

#[derive(Clone)]
pub struct AppState {
    pub queue: JobQueue,
    pub store: Arc<dyn ReviewStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/jobs", post(enqueue_job))
        .route("/jobs/{job_id}", get(job_status))
        .route("/companies/{company_id}/job", get(company_job_status))
        .route("/reports/{report_id}", get(get_report))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn enqueue_job(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> impl IntoResponse {
    let job_id = state.queue.enqueue(request);
    info!(%job_id, "Enqueued via API");
    (StatusCode::ACCEPTED, Json(json!({ "jobId": job_id })))
}

async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatus>, Response> {
    let Some(job) = state.queue.get_job(job_id) else {
        return Err(not_found("job not found"));
    };
    Ok(Json(status_of(&state, &job).await))
}

async fn company_job_status(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<JobStatus>, Response> {
    let Some(job) = state.queue.get_job_by_company(company_id) else {
        return Err(not_found("no job for company"));
    };
    Ok(Json(status_of(&state, &job).await))
}

async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<Response, Response> {
    match state.store.load_report(report_id).await {
        Ok(Some(document)) => Ok(Json(document).into_response()),
        Ok(None) => Err(not_found("report not found")),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response()),
    }
}

async fn status_of(state: &AppState, job: &Job) -> JobStatus {
    let progress_message = state
        .store
        .progress_message(job.report_id)
        .await
        .ok()
        .flatten()
        .or_else(|| job.error.clone())
        .unwrap_or_else(|| "Queued".to_string());
    let analysis_ready = state
        .store
        .report_ready(job.report_id)
        .await
        .unwrap_or(false);

    JobStatus {
        state: job.state,
        progress_message,
        analysis_ready,
    }
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

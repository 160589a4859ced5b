//! Progress reporting. Reporters are advisory: a failed publish is
//! logged and dropped, never allowed to abort the job itself.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;
use voclens_common::JobState;

use crate::store::ReviewStore;

#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn publish(&self, report_id: Uuid, company_id: Uuid, state: JobState, message: &str);
}

/// Writes progress into the report row so polling clients see it.
pub struct StoreReporter {
    store: Arc<dyn ReviewStore>,
}

impl StoreReporter {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProgressReporter for StoreReporter {
    async fn publish(&self, report_id: Uuid, company_id: Uuid, state: JobState, message: &str) {
        if let Err(e) = self
            .store
            .set_progress(report_id, company_id, state, message)
            .await
        {
            warn!(%report_id, error = %e, "Failed to publish progress");
        }
    }
}

pub struct NoopReporter;

#[async_trait]
impl ProgressReporter for NoopReporter {
    async fn publish(&self, _report_id: Uuid, _company_id: Uuid, _state: JobState, _message: &str) {
    }
}

//! In-process job queue with a single worker. One job runs at a time by
//! design: the scrape traffic and model spend of concurrent jobs for the
//! same deployment are not worth it. Enqueue order is execution order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;
use voclens_common::{EnqueueRequest, Job, JobState};

/// Terminal jobs kept for status polling before the oldest are purged.
const RETAINED_TERMINAL_JOBS: usize = 100;

/// The work a job performs, injected so the queue stays testable.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &Job) -> anyhow::Result<()>;
}

struct QueueInner {
    jobs: Mutex<Vec<Job>>,
    notify: Notify,
    shutdown: AtomicBool,
}

#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                jobs: Mutex::new(Vec::new()),
                notify: Notify::new(),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    pub fn enqueue(&self, request: EnqueueRequest) -> Uuid {
        let job = Job::new(request);
        let id = job.id;
        info!(job_id = %id, company_id = %job.company_id, "Job enqueued");
        self.inner.jobs.lock().unwrap().push(job);
        self.inner.notify.notify_one();
        id
    }

    pub fn get_job(&self, id: Uuid) -> Option<Job> {
        self.inner
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == id)
            .cloned()
    }

    /// Most recently created job for a company, regardless of state.
    pub fn get_job_by_company(&self, company_id: Uuid) -> Option<Job> {
        self.inner
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.company_id == company_id)
            .max_by_key(|j| j.created_at)
            .cloned()
    }

    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
    }

    /// Start the single worker. Claims the oldest pending job, runs it,
    /// records the outcome verbatim, and sweeps old terminal jobs.
    pub fn start(&self, runner: Arc<dyn JobRunner>) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            info!("Job worker started");
            loop {
                if inner.shutdown.load(Ordering::SeqCst) {
                    info!("Job worker stopping");
                    return;
                }

                let claimed = claim_next(&inner);
                let Some(job) = claimed else {
                    inner.notify.notified().await;
                    continue;
                };

                info!(job_id = %job.id, business = job.business_name, "Job started");
                let outcome = runner.run(&job).await;

                let mut jobs = inner.jobs.lock().unwrap();
                if let Some(entry) = jobs.iter_mut().find(|j| j.id == job.id) {
                    entry.completed_at = Some(Utc::now());
                    match outcome {
                        Ok(()) => {
                            entry.state = JobState::Completed;
                            info!(job_id = %job.id, "Job completed");
                        }
                        Err(e) => {
                            entry.state = JobState::Failed;
                            entry.error = Some(e.to_string());
                            error!(job_id = %job.id, error = %e, "Job failed");
                        }
                    }
                }
                sweep_terminal(&mut jobs);
            }
        })
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn claim_next(inner: &QueueInner) -> Option<Job> {
    let mut jobs = inner.jobs.lock().unwrap();
    let next = jobs
        .iter_mut()
        .filter(|j| j.state == JobState::Pending)
        .min_by_key(|j| j.created_at)?;
    next.state = JobState::Processing;
    next.started_at = Some(Utc::now());
    Some(next.clone())
}

/// Purge the oldest-completed terminal jobs beyond the retention cap.
/// Pending and processing jobs are never purged.
fn sweep_terminal(jobs: &mut Vec<Job>) {
    let terminal = jobs.iter().filter(|j| j.state.is_terminal()).count();
    if terminal <= RETAINED_TERMINAL_JOBS {
        return;
    }

    let mut completions: Vec<_> = jobs
        .iter()
        .filter(|j| j.state.is_terminal())
        .map(|j| (j.completed_at, j.id))
        .collect();
    completions.sort();
    let purge: std::collections::HashSet<Uuid> = completions
        .into_iter()
        .take(terminal - RETAINED_TERMINAL_JOBS)
        .map(|(_, id)| id)
        .collect();
    jobs.retain(|j| !purge.contains(&j.id));
}

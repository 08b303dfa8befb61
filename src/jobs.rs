//! Background units of work for question generation.
//!
//! `enqueue` only records the job and hands it to a bounded channel; a dispatcher task pulls
//! jobs and runs up to `workers` of them concurrently. Each job ends as `succeeded` with its
//! report or `failed` with the error message. Finished jobs are kept for the retention window,
//! then evicted on a later enqueue.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::pipeline::{GenerationReport, GenerationRequest, Generator};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded { report: GenerationReport },
    Failed { message: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct JobStatus {
    pub job_id: String,
    #[serde(flatten)]
    pub state: JobState,
    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Succeeded { .. } | JobState::Failed { .. })
    }
}

struct Job {
    id: String,
    request: GenerationRequest,
}

type StatusMap = Arc<RwLock<HashMap<String, JobStatus>>>;

#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    statuses: StatusMap,
    retention: Duration,
}

impl JobQueue {
    /// Start the dispatcher on the current runtime and return the queue handle.
    pub fn start(generator: Arc<Generator>, workers: usize, capacity: usize, retention: Duration) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let statuses: StatusMap = Arc::new(RwLock::new(HashMap::new()));
        tokio::spawn(dispatch(rx, generator, statuses.clone(), workers));
        info!(target: "generation", workers, capacity, retention_secs = retention.num_seconds(), "Generation queue started");
        Self { tx, statuses, retention }
    }

    /// Record and queue a generation run. Never waits for the run itself.
    #[instrument(level = "info", skip(self, request), fields(description_len = request.description.len()))]
    pub async fn enqueue(&self, request: GenerationRequest) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        {
            let mut statuses = self.statuses.write().await;
            let before = statuses.len();
            statuses.retain(|_, s| !(s.state.is_finished() && now - s.updated_at >= self.retention));
            let evicted = before - statuses.len();
            if evicted > 0 {
                info!(target: "generation", evicted, "Evicted finished jobs past retention");
            }
            statuses.insert(
                id.clone(),
                JobStatus { job_id: id.clone(), state: JobState::Queued, enqueued_at: now, updated_at: now },
            );
        }

        if let Err(e) = self.tx.try_send(Job { id: id.clone(), request }) {
            self.statuses.write().await.remove(&id);
            warn!(target: "generation", job_id = %id, error = %e, "Generation queue rejected job");
            return Err(AppError::Queue(format!("generation queue unavailable: {}", e)));
        }
        info!(target: "generation", job_id = %id, "Generation job queued");
        Ok(id)
    }

    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.statuses.read().await.get(job_id).cloned()
    }
}

async fn dispatch(mut rx: mpsc::Receiver<Job>, generator: Arc<Generator>, statuses: StatusMap, workers: usize) {
    let permits = Arc::new(Semaphore::new(workers));
    while let Some(job) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let generator = generator.clone();
        let statuses = statuses.clone();
        tokio::spawn(async move {
            run_job(job, &generator, &statuses).await;
            drop(permit);
        });
    }
    info!(target: "generation", "Generation queue closed");
}

async fn run_job(job: Job, generator: &Generator, statuses: &StatusMap) {
    set_state(statuses, &job.id, JobState::Running).await;
    info!(target: "generation", job_id = %job.id, "Generation job started");

    let state = match generator.run(&job.request).await {
        Ok(report) => {
            info!(target: "generation", job_id = %job.id, question_id = %report.question_id, "Generation job succeeded");
            JobState::Succeeded { report }
        }
        Err(e) => {
            error!(target: "generation", job_id = %job.id, error = %e, "Generation job failed");
            JobState::Failed { message: e.to_string() }
        }
    };
    set_state(statuses, &job.id, state).await;
}

async fn set_state(statuses: &StatusMap, id: &str, state: JobState) {
    if let Some(s) = statuses.write().await.get_mut(id) {
        s.state = state;
        s.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{MemoryBlobs, MemoryRecords, ScriptedCompletion};
    use crate::pipeline::tests::{generator, scripted};

    async fn wait_done(q: &JobQueue, id: &str) -> JobStatus {
        for _ in 0..200 {
            let s = q.status(id).await.unwrap();
            if s.state.is_finished() {
                return s;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("job {id} did not finish");
    }

    fn request(d: &str) -> GenerationRequest {
        GenerationRequest { description: d.into(), attachment_ids: vec![] }
    }

    #[tokio::test]
    async fn job_runs_to_success_with_report() {
        let records = Arc::new(MemoryRecords::default());
        let gen = generator(Arc::new(scripted()), Arc::new(MemoryBlobs::default()), records.clone());
        let q = JobQueue::start(Arc::new(gen), 2, 8, Duration::hours(1));

        let id = q.enqueue(request("count vowels")).await.unwrap();
        let done = wait_done(&q, &id).await;
        let JobState::Succeeded { report } = done.state else { panic!("expected success") };
        assert!(records.row(&report.question_id).is_some());
        assert!(done.updated_at >= done.enqueued_at);
    }

    #[tokio::test]
    async fn failing_job_reports_error_message() {
        let completion = Arc::new(ScriptedCompletion::new(vec![]));
        let gen = generator(completion, Arc::new(MemoryBlobs::default()), Arc::new(MemoryRecords::default()));
        let q = JobQueue::start(Arc::new(gen), 1, 8, Duration::hours(1));

        let id = q.enqueue(request("anything")).await.unwrap();
        let JobState::Failed { message } = wait_done(&q, &id).await.state else { panic!("expected failure") };
        assert!(message.contains("no scripted response"));
    }

    #[tokio::test]
    async fn unknown_job_has_no_status() {
        let gen = generator(Arc::new(scripted()), Arc::new(MemoryBlobs::default()), Arc::new(MemoryRecords::default()));
        let q = JobQueue::start(Arc::new(gen), 1, 1, Duration::hours(1));
        assert!(q.status("nope").await.is_none());
    }

    #[tokio::test]
    async fn finished_jobs_are_evicted_after_retention() {
        let gen = generator(Arc::new(scripted()), Arc::new(MemoryBlobs::default()), Arc::new(MemoryRecords::default()));
        let q = JobQueue::start(Arc::new(gen), 1, 8, Duration::zero());

        let first = q.enqueue(request("one")).await.unwrap();
        wait_done(&q, &first).await;
        let second = q.enqueue(request("two")).await.unwrap();

        assert!(q.status(&first).await.is_none());
        assert!(q.status(&second).await.is_some());
    }

    #[tokio::test]
    async fn finished_jobs_within_retention_are_kept() {
        let gen = generator(Arc::new(scripted()), Arc::new(MemoryBlobs::default()), Arc::new(MemoryRecords::default()));
        let q = JobQueue::start(Arc::new(gen), 1, 8, Duration::hours(1));

        let first = q.enqueue(request("one")).await.unwrap();
        wait_done(&q, &first).await;
        q.enqueue(request("two")).await.unwrap();
        assert!(q.status(&first).await.unwrap().state.is_finished());
    }

    #[test]
    fn status_serializes_flat_with_tag() {
        let now = Utc::now();
        let s = JobStatus { job_id: "j".into(), state: JobState::Failed { message: "boom".into() }, enqueued_at: now, updated_at: now };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["message"], "boom");
        assert_eq!(v["job_id"], "j");
    }
}

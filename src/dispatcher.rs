//! Job dispatcher: bounded-concurrency consumption of the planning queue.
//!
//! Blocks on the queue with a short poll timeout, starts one unit of work per
//! dequeued request gated by a counting semaphore, and isolates every unit:
//! a failing or panicking job becomes a structured FAILED report and never
//! touches the dispatcher loop or concurrent jobs. Duplicate in-flight
//! submissions are skipped with a warning. Shutdown stops dequeuing, signals
//! cooperative cancellation, and awaits all in-flight units.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

use crate::calendar::CalendarProvider;
use crate::config::WorkerConfig;
use crate::context::PlanContext;
use crate::error::PlanError;
use crate::normalize;
use crate::planner::PlanOrchestrator;
use crate::progress::{ProgressSink, ProgressUpdate};
use crate::queue::JobQueue;
use crate::store::JobStore;
use crate::travel::TravelEstimator;
use crate::types::{JobMessage, JobStatus, PlanningOutcome, PlanningRequest};

/// Worker introspection snapshot. Observability only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStats {
    pub running: bool,
    pub active_jobs: usize,
    pub max_concurrent_jobs: usize,
    pub queue_length: usize,
    pub active_job_ids: Vec<String>,
}

pub struct Dispatcher {
    config: Arc<WorkerConfig>,
    queue: Arc<dyn JobQueue>,
    store: Arc<parking_lot::Mutex<JobStore>>,
    calendar: Arc<dyn CalendarProvider>,
    travel: Arc<dyn TravelEstimator>,
    progress: Arc<dyn ProgressSink>,
    orchestrator: Arc<PlanOrchestrator>,
    semaphore: Arc<Semaphore>,
    active: parking_lot::Mutex<HashMap<String, Option<JoinHandle<()>>>>,
    shutdown: watch::Sender<bool>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<WorkerConfig>,
        queue: Arc<dyn JobQueue>,
        store: Arc<parking_lot::Mutex<JobStore>>,
        calendar: Arc<dyn CalendarProvider>,
        travel: Arc<dyn TravelEstimator>,
        progress: Arc<dyn ProgressSink>,
        orchestrator: Arc<PlanOrchestrator>,
    ) -> Arc<Self> {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            config,
            queue,
            store,
            calendar,
            travel,
            progress,
            orchestrator,
            semaphore,
            active: parking_lot::Mutex::new(HashMap::new()),
            shutdown,
        })
    }

    /// Consume the queue until shutdown is signalled. Queue errors pause
    /// briefly and keep the loop alive.
    pub async fn run(self: Arc<Self>) {
        log::info!(
            "Starting dispatcher with max {} concurrent jobs",
            self.config.max_concurrent_jobs
        );
        let poll = Duration::from_secs(self.config.queue_poll_secs.max(1));

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            match self.queue.pop(poll).await {
                Ok(Some(message)) => self.clone().handle_message(message),
                Ok(None) => {}
                Err(e) => {
                    log::error!("Error in dispatcher loop: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
        log::info!("Dispatcher loop stopped");
    }

    /// Stop dequeuing, cancel in-flight jobs, and await their termination.
    pub async fn shutdown(&self) {
        log::info!("Stopping dispatcher...");
        let _ = self.shutdown.send(true);

        let handles: Vec<JoinHandle<()>> = {
            let mut active = self.active.lock();
            let count = active.len();
            if count > 0 {
                log::info!("Cancelling {} active jobs", count);
            }
            active.drain().filter_map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
        // A unit spawned moments before the flag flipped may not have had its
        // handle recorded yet; wait for those stragglers too.
        for _ in 0..100 {
            if self.active.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        log::info!("Dispatcher stopped");
    }

    pub async fn stats(&self) -> WorkerStats {
        let (active_jobs, active_job_ids) = {
            let active = self.active.lock();
            (active.len(), active.keys().cloned().collect())
        };
        WorkerStats {
            running: !*self.shutdown.borrow(),
            active_jobs,
            max_concurrent_jobs: self.config.max_concurrent_jobs,
            queue_length: self.queue.len().await,
            active_job_ids,
        }
    }

    /// Accept one dequeued message: validate, dedup against in-flight jobs,
    /// and spawn an isolated unit of work.
    fn handle_message(self: Arc<Self>, message: JobMessage) {
        let job_id = message.job_id.clone();
        if job_id.is_empty() {
            log::error!("Dispatcher: received job without job_id, dropping");
            return;
        }

        {
            let mut active = self.active.lock();
            if active.contains_key(&job_id) {
                log::warn!("Job {} already being processed, skipping", job_id);
                return;
            }
            active.insert(job_id.clone(), None);
            log::info!(
                "Started processing job {} ({}/{} active)",
                job_id,
                active.len(),
                self.config.max_concurrent_jobs
            );
        }

        let this = self.clone();
        let supervised_id = job_id.clone();
        let handle = tokio::spawn(async move {
            // Inner task so a panic inside the job is caught here and turned
            // into a FAILED report instead of taking the unit down silently.
            let worker = this.clone();
            let inner = tokio::spawn(async move { worker.process_job(message).await });
            if let Err(join_err) = inner.await {
                log::error!("Job {} task panicked: {}", supervised_id, join_err);
                this.report_failure(
                    &supervised_id,
                    0.0,
                    "Worker task panicked",
                    &format!("Worker task panicked: {}", join_err),
                )
                .await;
            }
            this.active.lock().remove(&supervised_id);
        });

        // The supervisor may already have finished and removed the entry; in
        // that case the handle has nothing left to guard.
        if let Some(slot) = self.active.lock().get_mut(&job_id) {
            *slot = Some(handle);
        }
    }

    /// One unit of work: acquire a concurrency permit, build the request,
    /// run the planner under the per-job timeout, and report the outcome.
    async fn process_job(self: Arc<Self>, message: JobMessage) {
        let job_id = message.job_id.clone();
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        if *self.shutdown.borrow() {
            log::info!("Job {} skipped: shutdown in progress", job_id);
            return;
        }

        log::info!(
            "Processing job {} for user {}, target date {}",
            job_id,
            message.user_id,
            message.target_date
        );

        {
            let store = self.store.lock();
            if let Err(e) = store.create_job(&job_id, &message.user_id, &message.target_date) {
                log::warn!("Failed to create job row for {}: {}", job_id, e);
            }
        }

        let input_data = normalize::normalize_input_data(&message.input_data);
        let target_date = match normalize::parse_target_date(&message.target_date) {
            Ok(date) => date,
            Err(e) => {
                self.report_failure(&job_id, 0.0, "Starting workflow", &e.to_string())
                    .await;
                return;
            }
        };
        // Deterministic path defaults to the configured zone when the input
        // carries none; the enrichment path enforces its own requirement.
        let user_timezone = normalize::user_timezone_from_input(&input_data)
            .and_then(|tz| {
                tz.parse()
                    .map_err(|_| log::warn!("Job {}: invalid user_timezone '{}'", job_id, tz))
                    .ok()
            })
            .unwrap_or(self.config.default_timezone);

        let request = PlanningRequest {
            job_id: job_id.clone(),
            user_id: message.user_id.clone(),
            target_date,
            user_timezone,
        };

        {
            let store = self.store.lock();
            if let Err(e) = store.update_status(
                &job_id,
                JobStatus::InProgress,
                0.0,
                Some("Starting workflow"),
                None,
                None,
            ) {
                log::warn!("Failed to mark {} in progress: {}", job_id, e);
            }
        }
        self.progress
            .publish(ProgressUpdate::new(
                &job_id,
                JobStatus::InProgress,
                0.0,
                "Starting workflow",
            ))
            .await;

        let ctx = PlanContext::new(
            self.config.clone(),
            self.store.clone(),
            self.calendar.clone(),
            self.travel.clone(),
            self.progress.clone(),
            self.shutdown.subscribe(),
        );

        let budget = Duration::from_secs(self.config.job_timeout_secs);
        let outcome =
            tokio::time::timeout(budget, self.orchestrator.plan(&ctx, &request, &input_data)).await;

        match outcome {
            Ok(Ok(PlanningOutcome::Success(success))) => {
                let result = match serde_json::to_value(&success) {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("Job {}: result serialization failed: {}", job_id, e);
                        serde_json::Value::Null
                    }
                };
                {
                    let store = self.store.lock();
                    if let Err(e) = store.update_status(
                        &job_id,
                        JobStatus::Completed,
                        1.0,
                        Some("Workflow completed"),
                        Some(&result),
                        None,
                    ) {
                        log::warn!("Failed to mark {} completed: {}", job_id, e);
                    }
                }
                self.progress
                    .publish(ProgressUpdate::new(
                        &job_id,
                        JobStatus::Completed,
                        1.0,
                        "Workflow completed",
                    ))
                    .await;
                log::info!("Successfully completed job {}", job_id);
            }
            Ok(Ok(PlanningOutcome::Error(failure))) => {
                self.report_failure(
                    &job_id,
                    failure.progress_when_failed,
                    &failure.failed_at_step,
                    &failure.error_message,
                )
                .await;
            }
            Ok(Err(e)) if e.is_cancellation() => {
                // No terminal status write: the job keeps whatever state was
                // already committed before shutdown.
                log::info!("Job {} cancelled during shutdown", job_id);
            }
            Ok(Err(e)) => {
                self.report_failure(&job_id, 0.0, "Starting workflow", &e.to_string())
                    .await;
            }
            Err(_elapsed) => {
                let error = PlanError::Timeout(self.config.job_timeout_secs);
                let (frozen_progress, frozen_step) = {
                    let store = self.store.lock();
                    store
                        .get_job(&job_id)
                        .ok()
                        .flatten()
                        .map(|r| {
                            (
                                r.progress,
                                r.current_step
                                    .unwrap_or_else(|| "Starting workflow".to_string()),
                            )
                        })
                        .unwrap_or((0.0, "Starting workflow".to_string()))
                };
                self.report_failure(&job_id, frozen_progress, &frozen_step, &error.to_string())
                    .await;
            }
        }
        drop(permit);
    }

    /// Structured FAILED report: status write with frozen progress plus a
    /// progress-sink notification.
    async fn report_failure(&self, job_id: &str, progress: f64, step: &str, message: &str) {
        log::error!("Job {} failed: {}", job_id, message);
        {
            let store = self.store.lock();
            if let Err(e) = store.update_status(
                job_id,
                JobStatus::Failed,
                progress,
                Some(step),
                None,
                Some(message),
            ) {
                log::warn!("Failed to mark {} failed: {}", job_id, e);
            }
        }
        self.progress
            .publish(
                ProgressUpdate::new(job_id, JobStatus::Failed, progress, step)
                    .with_error(message),
            )
            .await;
    }
}

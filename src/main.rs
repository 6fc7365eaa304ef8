//! Worker entry point: wire the collaborators, run the dispatcher, and shut
//! down cleanly on Ctrl-C.

use std::sync::Arc;

use commuteplan::calendar::DemoCalendar;
use commuteplan::config::WorkerConfig;
use commuteplan::dispatcher::Dispatcher;
use commuteplan::planner::PlanOrchestrator;
use commuteplan::progress::LogProgressSink;
use commuteplan::queue::{InMemoryQueue, JobQueue};
use commuteplan::store::JobStore;
use commuteplan::travel::ScenarioTravel;
use commuteplan::types::JobMessage;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Arc::new(WorkerConfig::from_env());
    log::info!(
        "Initializing planning worker (queue '{}', max {} concurrent jobs)",
        config.job_queue,
        config.max_concurrent_jobs
    );

    let store = match JobStore::open_at(config.resolve_db_path()) {
        Ok(store) => Arc::new(parking_lot::Mutex::new(store)),
        Err(e) => {
            log::error!("Failed to open job store: {}", e);
            std::process::exit(1);
        }
    };

    let queue: Arc<InMemoryQueue> = Arc::new(InMemoryQueue::new());
    let dispatcher = Dispatcher::new(
        config.clone(),
        queue.clone(),
        store,
        Arc::new(DemoCalendar),
        Arc::new(ScenarioTravel::new(config.default_timezone)),
        Arc::new(LogProgressSink::new(config.progress_channel.clone())),
        Arc::new(PlanOrchestrator::new()),
    );

    // Optional demo submission so a fresh checkout produces a visible plan:
    // COMMUTEPLAN_DEMO_USER=demo-user-123 COMMUTEPLAN_DEMO_DATE=2025-03-14
    if let Ok(user_id) = std::env::var("COMMUTEPLAN_DEMO_USER") {
        let target_date = std::env::var("COMMUTEPLAN_DEMO_DATE")
            .unwrap_or_else(|_| chrono::Utc::now().date_naive().to_string());
        let message = JobMessage {
            job_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            target_date,
            input_data: serde_json::json!({}),
        };
        log::info!("Enqueuing demo job {}", message.job_id);
        if let Err(e) = queue.push(message).await {
            log::warn!("Failed to enqueue demo job: {}", e);
        }
    }

    let runner = dispatcher.clone();
    let run_handle = tokio::spawn(runner.run());

    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutdown signal received"),
        Err(e) => log::error!("Failed to listen for shutdown signal: {}", e),
    }

    dispatcher.shutdown().await;
    let _ = run_handle.await;

    let stats = dispatcher.stats().await;
    log::info!(
        "Worker stopped ({} jobs still queued, {} active)",
        stats.queue_length,
        stats.active_jobs
    );
}

//! Job queue ingress.
//!
//! The dispatcher consumes planning requests from a `JobQueue`: a blocking
//! pop with a short timeout so shutdown is observed promptly. Delivery is
//! destructive (at-most-once to this worker). The in-memory implementation
//! backs tests and single-process deployments; a broker-backed queue plugs in
//! behind the same trait.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::PlanError;
use crate::types::JobMessage;

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a planning request.
    async fn push(&self, message: JobMessage) -> Result<(), PlanError>;

    /// Destructively pop the oldest request, waiting up to `timeout`.
    /// Returns `None` on timeout.
    async fn pop(&self, timeout: Duration) -> Result<Option<JobMessage>, PlanError>;

    /// Current queue depth (for diagnostics).
    async fn len(&self) -> usize;
}

/// FIFO queue held in process memory.
#[derive(Default)]
pub struct InMemoryQueue {
    inner: parking_lot::Mutex<VecDeque<JobMessage>>,
    notify: Notify,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    async fn push(&self, message: JobMessage) -> Result<(), PlanError> {
        log::debug!("Queue: enqueued job {}", message.job_id);
        self.inner.lock().push_back(message);
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<JobMessage>, PlanError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.inner.lock().pop_front() {
                return Ok(Some(message));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(deadline - now) => return Ok(None),
            }
        }
    }

    async fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(job_id: &str) -> JobMessage {
        JobMessage {
            job_id: job_id.to_string(),
            user_id: "user-1".to_string(),
            target_date: "2025-03-11".to_string(),
            input_data: json!({}),
        }
    }

    #[tokio::test]
    async fn test_push_pop_fifo() {
        let queue = InMemoryQueue::new();
        queue.push(message("a")).await.unwrap();
        queue.push(message("b")).await.unwrap();
        assert_eq!(queue.len().await, 2);

        let first = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(first.job_id, "a");
        let second = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(second.job_id, "b");
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn test_pop_times_out_when_empty() {
        let queue = InMemoryQueue::new();
        let popped = queue.pop(Duration::from_millis(20)).await.unwrap();
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = std::sync::Arc::new(InMemoryQueue::new());
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push(message("late")).await.unwrap();
        });
        let popped = queue.pop(Duration::from_secs(2)).await.unwrap();
        assert_eq!(popped.unwrap().job_id, "late");
    }
}

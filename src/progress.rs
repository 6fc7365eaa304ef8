//! Progress publishing.
//!
//! Every stage transition and terminal outcome is published to a
//! `ProgressSink`, fire and forget, so a slow or broken sink can never stall
//! a pipeline. Updates for one job are published in stage order with
//! monotonically non-decreasing progress; there is no ordering guarantee
//! across jobs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::JobStatus;

/// Per-stage object counts included with progress updates so observers can
/// show detail without polling internal state.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDetails {
    pub calendar_events_count: usize,
    pub meeting_classifications_count: usize,
    pub presence_blocks_count: usize,
    pub commute_options_count: usize,
    pub recommendations_count: usize,
}

/// One published status transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: f64,
    pub current_step: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ProgressDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressUpdate {
    pub fn new(job_id: &str, status: JobStatus, progress: f64, step: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status,
            progress,
            current_step: step.to_string(),
            timestamp: Utc::now(),
            details: None,
            error: None,
        }
    }

    pub fn with_details(mut self, details: ProgressDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Publish a status transition. Must not fail the caller; sink errors
    /// are swallowed and logged by the implementation.
    async fn publish(&self, update: ProgressUpdate);
}

/// Sink that writes updates to the log, for development and single-process
/// deployments without a broker.
pub struct LogProgressSink {
    channel: String,
}

impl LogProgressSink {
    pub fn new(channel: impl Into<String>) -> Self {
        Self { channel: channel.into() }
    }
}

#[async_trait]
impl ProgressSink for LogProgressSink {
    async fn publish(&self, update: ProgressUpdate) {
        match serde_json::to_string(&update) {
            Ok(payload) => log::debug!("Progress[{}]: {}", self.channel, payload),
            Err(e) => log::warn!("Progress[{}]: failed to serialize update: {}", self.channel, e),
        }
    }
}

/// Sink that forwards updates to an unbounded channel. Used by tests and by
/// embedders that want to observe transitions directly.
pub struct ChannelProgressSink {
    sender: tokio::sync::mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelProgressSink {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn publish(&self, update: ProgressUpdate) {
        // Receiver may be gone (test finished early); fire and forget.
        let _ = self.sender.send(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_serializes_camel_case() {
        let update = ProgressUpdate::new("job-1", JobStatus::InProgress, 0.4, "Classifying")
            .with_details(ProgressDetails {
                calendar_events_count: 3,
                meeting_classifications_count: 3,
                ..Default::default()
            });
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["currentStep"], "Classifying");
        assert_eq!(json["details"]["calendarEventsCount"], 3);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelProgressSink::new();
        sink.publish(ProgressUpdate::new("j", JobStatus::Completed, 1.0, "done"))
            .await;
        let update = rx.recv().await.unwrap();
        assert_eq!(update.status, JobStatus::Completed);
        assert_eq!(update.progress, 1.0);
    }
}

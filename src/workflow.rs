//! The five-stage planning pipeline.
//!
//! A strict, non-branching sequence over one exclusively-owned
//! `PlanningState`:
//! Schedule Analysis → Meeting Classification → Presence Validation →
//! Commute Optimization → Option Presentation.
//!
//! After each stage the sequencer checks for failure and short-circuits to a
//! structured error result tagging the failing step and frozen progress. It
//! never invokes later stages and never retries (retry happens by
//! re-submitting the whole job). Progress checkpoints are fixed per stage and
//! published monotonically.

use serde_json::Value;

use crate::classify;
use crate::commute;
use crate::context::PlanContext;
use crate::error::PlanError;
use crate::presence;
use crate::present;
use crate::progress::{ProgressDetails, ProgressUpdate};
use crate::schedule;
use crate::types::{
    CalendarEvent, CommuteOption, JobStatus, MeetingClassification, PartialCounts,
    PlanningFailure, PlanningOutcome, PlanningRequest, PlanningSuccess, PresenceBlock,
    Recommendation, WorkflowSummary,
};

/// The single mutable aggregate threaded through all stages. Owned by exactly
/// one pipeline execution; never shared across jobs.
pub struct PlanningState {
    pub request: PlanningRequest,
    pub input_data: Value,
    pub progress_step: String,
    pub progress_fraction: f64,
    pub calendar_events: Vec<CalendarEvent>,
    pub classifications: Vec<MeetingClassification>,
    pub presence_blocks: Vec<PresenceBlock>,
    pub commute_options: Vec<CommuteOption>,
    pub recommendations: Vec<Recommendation>,
}

impl PlanningState {
    fn new(request: PlanningRequest, input_data: Value) -> Self {
        Self {
            request,
            input_data,
            progress_step: "Initializing workflow".to_string(),
            progress_fraction: 0.0,
            calendar_events: Vec::new(),
            classifications: Vec::new(),
            presence_blocks: Vec::new(),
            commute_options: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    fn details(&self) -> ProgressDetails {
        ProgressDetails {
            calendar_events_count: self.calendar_events.len(),
            meeting_classifications_count: self.classifications.len(),
            presence_blocks_count: self.presence_blocks.len(),
            commute_options_count: self.commute_options.len(),
            recommendations_count: self.recommendations.len(),
        }
    }

    fn partial_counts(&self) -> PartialCounts {
        PartialCounts {
            calendar_events: self.calendar_events.len(),
            meeting_classifications: self.classifications.len(),
            presence_blocks: self.presence_blocks.len(),
            commute_options: self.commute_options.len(),
        }
    }
}

/// Run the full pipeline for one request.
///
/// Returns `Err` only for cooperative cancellation; every other failure is
/// folded into a structured `PlanningOutcome::Error` so the dispatcher can
/// report it without tearing anything down.
pub async fn execute(
    ctx: &PlanContext,
    request: &PlanningRequest,
    input_data: &Value,
) -> Result<PlanningOutcome, PlanError> {
    let mut state = PlanningState::new(request.clone(), input_data.clone());
    log::info!(
        "Starting planning workflow for job {} (user {}, {})",
        request.job_id,
        request.user_id,
        request.target_date
    );
    checkpoint(ctx, &mut state, 0.0, "Initializing workflow").await;

    if let Err(e) = stage_schedule(ctx, &mut state).await {
        return finish_error(&state, "Schedule analysis", e);
    }
    if let Err(e) = stage_classify(ctx, &mut state).await {
        return finish_error(&state, "Meeting classification", e);
    }
    if let Err(e) = stage_presence(ctx, &mut state).await {
        return finish_error(&state, "Office presence validation", e);
    }
    if let Err(e) = stage_commute(ctx, &mut state).await {
        return finish_error(&state, "Commute optimization", e);
    }
    if let Err(e) = stage_present(ctx, &mut state).await {
        return finish_error(&state, "Option presentation", e);
    }

    log::info!(
        "Workflow completed for job {}: {} recommendations",
        state.request.job_id,
        state.recommendations.len()
    );
    Ok(PlanningOutcome::Success(success_result(state)))
}

/// Stage 1: fetch, sanitize, and analyze the day's calendar.
async fn stage_schedule(ctx: &PlanContext, state: &mut PlanningState) -> Result<(), PlanError> {
    checkpoint(ctx, state, 0.1, "Analyzing calendar schedule").await;
    if ctx.is_cancelled() {
        return Err(PlanError::Cancelled);
    }

    let events =
        schedule::fetch_events(&state.request, &ctx.store, ctx.calendar.as_ref()).await?;
    let events = schedule::sanitize_events(events);
    let analysis = schedule::analyze_patterns(&events, state.request.user_timezone);
    log::info!(
        "Schedule analysis complete: {} events, {} minutes of meetings",
        events.len(),
        analysis.total_meeting_minutes
    );

    state.calendar_events = events;
    checkpoint(ctx, state, 0.2, "Analyzing calendar schedule").await;
    Ok(())
}

/// Stage 2: classify each meeting as office-required or remote-viable.
async fn stage_classify(ctx: &PlanContext, state: &mut PlanningState) -> Result<(), PlanError> {
    checkpoint(ctx, state, 0.3, "Classifying meeting requirements").await;
    if ctx.is_cancelled() {
        return Err(PlanError::Cancelled);
    }

    state.classifications =
        classify::classify_events(&state.calendar_events, state.request.user_timezone);
    let summary = classify::summarize(&state.classifications);
    log::info!(
        "Meeting classification complete: {} office-required, {} remote-friendly",
        summary.office_required,
        summary.remote_friendly
    );

    checkpoint(ctx, state, 0.4, "Classifying meeting requirements").await;
    Ok(())
}

/// Stage 3: generate and score presence candidates against business rules.
async fn stage_presence(ctx: &PlanContext, state: &mut PlanningState) -> Result<(), PlanError> {
    checkpoint(ctx, state, 0.5, "Validating office presence rules").await;
    if ctx.is_cancelled() {
        return Err(PlanError::Cancelled);
    }

    let weekday = chrono::Datelike::weekday(&state.request.target_date);
    state.presence_blocks =
        presence::validate_presence(&state.classifications, weekday, &ctx.config.policy);
    log::info!(
        "Generated {} validated presence options",
        state.presence_blocks.len()
    );

    checkpoint(ctx, state, 0.6, "Validating office presence rules").await;
    Ok(())
}

/// Stage 4: resolve presence windows into concrete commute timings.
async fn stage_commute(ctx: &PlanContext, state: &mut PlanningState) -> Result<(), PlanError> {
    checkpoint(ctx, state, 0.7, "Optimizing commute routes and timing").await;
    if ctx.is_cancelled() {
        return Err(PlanError::Cancelled);
    }

    state.commute_options = commute::optimize_commute(
        &state.presence_blocks,
        &state.request,
        ctx.travel.as_ref(),
        &ctx.cancel_receiver(),
    )
    .await?;

    checkpoint(ctx, state, 0.8, "Optimizing commute routes and timing").await;
    Ok(())
}

/// Stage 5: rank the options, render recommendations, persist them.
async fn stage_present(ctx: &PlanContext, state: &mut PlanningState) -> Result<(), PlanError> {
    checkpoint(ctx, state, 0.9, "Finalizing recommendations").await;
    if ctx.is_cancelled() {
        return Err(PlanError::Cancelled);
    }

    state.recommendations = present::present_recommendations(&state.commute_options);
    {
        let store = ctx.store.lock();
        store
            .save_recommendations(&state.request.job_id, &state.recommendations)
            .map_err(|e| PlanError::Collaborator(format!("Saving recommendations failed: {}", e)))?;
    }

    checkpoint(ctx, state, 1.0, "Recommendations complete").await;
    Ok(())
}

/// Record a progress checkpoint: mutate state, mirror to the job store, and
/// publish to the sink.
async fn checkpoint(ctx: &PlanContext, state: &mut PlanningState, fraction: f64, step: &str) {
    state.progress_fraction = fraction;
    state.progress_step = step.to_string();
    {
        let store = ctx.store.lock();
        if let Err(e) = store.update_progress(&state.request.job_id, fraction, step) {
            log::warn!("Failed to mirror progress for {}: {}", state.request.job_id, e);
        }
    }
    let update =
        ProgressUpdate::new(&state.request.job_id, JobStatus::InProgress, fraction, step)
            .with_details(state.details());
    ctx.progress.publish(update).await;
}

fn success_result(state: PlanningState) -> PlanningSuccess {
    let office_options_evaluated = state
        .presence_blocks
        .iter()
        .filter(|b| !b.kind.is_remote())
        .count();
    PlanningSuccess {
        job_id: state.request.job_id.clone(),
        user_id: state.request.user_id.clone(),
        target_date: state.request.target_date.to_string(),
        workflow_summary: WorkflowSummary {
            calendar_events_analyzed: state.calendar_events.len(),
            meetings_classified: state.classifications.len(),
            office_options_evaluated,
            total_options_generated: state.commute_options.len(),
            final_recommendations: state.recommendations.len(),
        },
        recommendations: state.recommendations,
        execution_time: chrono::Utc::now(),
    }
}

/// Fold a stage error into a structured failure result. Cancellation
/// propagates as `Err` so the dispatcher can skip terminal status writes.
fn finish_error(
    state: &PlanningState,
    stage: &'static str,
    error: PlanError,
) -> Result<PlanningOutcome, PlanError> {
    if error.is_cancellation() {
        return Err(error);
    }
    let error = match error {
        e @ (PlanError::Timeout(_) | PlanError::Configuration(_)) => e,
        other => PlanError::Stage { stage, message: other.to_string() },
    };
    log::error!(
        "Job {} failed at '{}' ({:.0}%): {}",
        state.request.job_id,
        state.progress_step,
        state.progress_fraction * 100.0,
        error
    );
    Ok(PlanningOutcome::Error(PlanningFailure {
        job_id: state.request.job_id.clone(),
        user_id: state.request.user_id.clone(),
        target_date: state.request.target_date.to_string(),
        error_message: error.to_string(),
        error_kind: error.kind(),
        failed_at_step: state.progress_step.clone(),
        progress_when_failed: state.progress_fraction,
        partial_results: state.partial_counts(),
        execution_time: chrono::Utc::now(),
    }))
}

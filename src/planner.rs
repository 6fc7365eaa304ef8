//! Planner strategies and the orchestrator that chooses between them.
//!
//! Exactly one capability contract: `Planner::plan(request) → outcome`. The
//! deterministic rule pipeline always implements it; an enrichment planner
//! (LLM-backed, out of scope here) may be plugged in behind the same trait.
//! The orchestrator selects per user class and falls back by catching the
//! typed `EnrichmentUnavailable` error, never by inspecting arbitrary
//! failures.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::PlanContext;
use crate::error::PlanError;
use crate::normalize;
use crate::types::{PlanningOutcome, PlanningRequest};
use crate::workflow;

#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        ctx: &PlanContext,
        request: &PlanningRequest,
        input_data: &Value,
    ) -> Result<PlanningOutcome, PlanError>;
}

/// The deterministic five-stage pipeline.
pub struct RulePlanner;

#[async_trait]
impl Planner for RulePlanner {
    async fn plan(
        &self,
        ctx: &PlanContext,
        request: &PlanningRequest,
        input_data: &Value,
    ) -> Result<PlanningOutcome, PlanError> {
        workflow::execute(ctx, request, input_data).await
    }
}

// =============================================================================
// User class
// =============================================================================

/// What to do when the enrichment planner is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStrategy {
    /// Real users get a clear error instead of silently degraded output.
    FailFast,
    /// Demo-class users fall back to the rule-based planner.
    RuleFallback,
}

const DEMO_USER_PATTERNS: &[&str] = &["demo", "test", "example", "sample"];

const DEMO_USER_IDS: &[&str] = &["demo-user-123", "test-user-456", "sample-user-789"];

/// Determine whether a user id belongs to a demo-class account.
pub fn is_demo_user(user_id: &str) -> bool {
    if user_id.is_empty() {
        return false;
    }
    if DEMO_USER_IDS.contains(&user_id) {
        return true;
    }
    let lower = user_id.to_lowercase();
    DEMO_USER_PATTERNS.iter().any(|p| lower.contains(p))
}

pub fn fallback_strategy(user_id: &str) -> FallbackStrategy {
    if is_demo_user(user_id) {
        FallbackStrategy::RuleFallback
    } else {
        FallbackStrategy::FailFast
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Chooses the enrichment planner when configured and available, otherwise
/// the rule pipeline.
pub struct PlanOrchestrator {
    rule: Box<dyn Planner>,
    enrichment: Option<Box<dyn Planner>>,
}

impl PlanOrchestrator {
    pub fn new() -> Self {
        Self { rule: Box::new(RulePlanner), enrichment: None }
    }

    /// Swap the deterministic planner. Used by tests and embedders that wrap
    /// the pipeline.
    pub fn with_rule_planner(planner: Box<dyn Planner>) -> Self {
        Self { rule: planner, enrichment: None }
    }

    pub fn with_enrichment(mut self, planner: Box<dyn Planner>) -> Self {
        self.enrichment = Some(planner);
        self
    }

    pub async fn plan(
        &self,
        ctx: &PlanContext,
        request: &PlanningRequest,
        input_data: &Value,
    ) -> Result<PlanningOutcome, PlanError> {
        let enrichment = match (&self.enrichment, ctx.config.use_enrichment) {
            (Some(planner), true) => planner,
            _ => {
                log::debug!("Job {}: using rule-based planner", request.job_id);
                return self.rule.plan(ctx, request, input_data).await;
            }
        };

        // The enrichment path must know the user's zone; silently defaulting
        // to UTC is only acceptable for the deterministic path.
        if normalize::user_timezone_from_input(input_data).is_none() {
            return Err(PlanError::Configuration(
                "input_data.context.user_timezone is required for the enrichment planner"
                    .to_string(),
            ));
        }

        log::info!("Job {}: attempting enrichment planner", request.job_id);
        match enrichment.plan(ctx, request, input_data).await {
            Ok(outcome) => Ok(outcome),
            Err(PlanError::EnrichmentUnavailable(reason)) => {
                match fallback_strategy(&request.user_id) {
                    FallbackStrategy::RuleFallback => {
                        log::warn!(
                            "Job {}: enrichment unavailable ({}), demo user falls back to rules",
                            request.job_id,
                            reason
                        );
                        self.rule.plan(ctx, request, input_data).await
                    }
                    FallbackStrategy::FailFast => {
                        log::error!(
                            "Job {}: enrichment unavailable ({}), failing fast for real user",
                            request.job_id,
                            reason
                        );
                        Err(PlanError::EnrichmentUnavailable(format!(
                            "Planning service temporarily unavailable: {}. Please try again later.",
                            reason
                        )))
                    }
                }
            }
            Err(other) => Err(other),
        }
    }
}

impl Default for PlanOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DemoCalendar;
    use crate::config::WorkerConfig;
    use crate::progress::LogProgressSink;
    use crate::store::JobStore;
    use crate::travel::ScenarioTravel;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::watch;

    struct UnavailableEnrichment;

    #[async_trait]
    impl Planner for UnavailableEnrichment {
        async fn plan(
            &self,
            _ctx: &PlanContext,
            _request: &PlanningRequest,
            _input_data: &Value,
        ) -> Result<PlanningOutcome, PlanError> {
            Err(PlanError::EnrichmentUnavailable("model endpoint down".into()))
        }
    }

    fn build_ctx(use_enrichment: bool) -> PlanContext {
        let mut config = WorkerConfig::default();
        config.use_enrichment = use_enrichment;
        PlanContext::new(
            Arc::new(config),
            Arc::new(parking_lot::Mutex::new(JobStore::open_in_memory().unwrap())),
            Arc::new(DemoCalendar),
            Arc::new(ScenarioTravel::new(chrono_tz::UTC)),
            Arc::new(LogProgressSink::new("job_progress")),
            watch::channel(false).1,
        )
    }

    fn request(user_id: &str) -> PlanningRequest {
        PlanningRequest {
            job_id: "job-1".to_string(),
            user_id: user_id.to_string(),
            target_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            user_timezone: chrono_tz::UTC,
        }
    }

    fn input_with_timezone() -> Value {
        json!({"context": {"user_timezone": "America/New_York"}})
    }

    #[test]
    fn test_demo_user_detection() {
        assert!(is_demo_user("demo-user-123"));
        assert!(is_demo_user("my-test-account"));
        assert!(is_demo_user("Sample-User"));
        assert!(!is_demo_user("alice@company.com"));
        assert!(!is_demo_user(""));
    }

    #[test]
    fn test_fallback_strategy_per_class() {
        assert_eq!(fallback_strategy("demo-1"), FallbackStrategy::RuleFallback);
        assert_eq!(fallback_strategy("alice"), FallbackStrategy::FailFast);
    }

    #[tokio::test]
    async fn test_rule_planner_used_without_enrichment() {
        let ctx = build_ctx(false);
        let orchestrator = PlanOrchestrator::new();
        let outcome = orchestrator
            .plan(&ctx, &request("alice"), &json!({}))
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_enrichment_requires_user_timezone() {
        let ctx = build_ctx(true);
        let orchestrator =
            PlanOrchestrator::new().with_enrichment(Box::new(UnavailableEnrichment));
        let result = orchestrator.plan(&ctx, &request("alice"), &json!({})).await;
        assert!(matches!(result, Err(PlanError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_demo_user_falls_back_to_rules() {
        let ctx = build_ctx(true);
        let orchestrator =
            PlanOrchestrator::new().with_enrichment(Box::new(UnavailableEnrichment));
        let outcome = orchestrator
            .plan(&ctx, &request("demo-user-123"), &input_with_timezone())
            .await
            .unwrap();
        assert!(outcome.is_success(), "demo users get the rule-based plan");
    }

    #[tokio::test]
    async fn test_real_user_fails_fast() {
        let ctx = build_ctx(true);
        let orchestrator =
            PlanOrchestrator::new().with_enrichment(Box::new(UnavailableEnrichment));
        let result = orchestrator
            .plan(&ctx, &request("alice"), &input_with_timezone())
            .await;
        match result {
            Err(PlanError::EnrichmentUnavailable(message)) => {
                assert!(message.contains("try again later"));
            }
            other => panic!("expected EnrichmentUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_enrichment_configured_but_disabled_uses_rules() {
        let ctx = build_ctx(false);
        let orchestrator =
            PlanOrchestrator::new().with_enrichment(Box::new(UnavailableEnrichment));
        let outcome = orchestrator
            .plan(&ctx, &request("alice"), &json!({}))
            .await
            .unwrap();
        assert!(outcome.is_success());
    }
}

//! Core domain types threaded through the planning pipeline.
//!
//! Outward-facing payloads (progress updates, stored job rows, ranked
//! recommendations) have explicit serde shapes; everything else is plain
//! internal state owned by exactly one pipeline run.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

// =============================================================================
// Calendar events
// =============================================================================

/// Known meeting types. Anything unrecognized parses to `Unknown` and falls
/// through to keyword scoring in the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingType {
    ClientMeeting,
    Presentation,
    TeamWorkshop,
    Interview,
    StakeholderMeeting,
    OneOnOne,
    StatusUpdate,
    Review,
    Brainstorming,
    CheckIn,
    #[serde(other)]
    Unknown,
}

impl MeetingType {
    pub fn parse(value: &str) -> Self {
        match value {
            "CLIENT_MEETING" => Self::ClientMeeting,
            "PRESENTATION" => Self::Presentation,
            "TEAM_WORKSHOP" => Self::TeamWorkshop,
            "INTERVIEW" => Self::Interview,
            "STAKEHOLDER_MEETING" => Self::StakeholderMeeting,
            "ONE_ON_ONE" => Self::OneOnOne,
            "STATUS_UPDATE" => Self::StatusUpdate,
            "REVIEW" => Self::Review,
            "BRAINSTORMING" => Self::Brainstorming,
            "CHECK_IN" => Self::CheckIn,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientMeeting => "CLIENT_MEETING",
            Self::Presentation => "PRESENTATION",
            Self::TeamWorkshop => "TEAM_WORKSHOP",
            Self::Interview => "INTERVIEW",
            Self::StakeholderMeeting => "STAKEHOLDER_MEETING",
            Self::OneOnOne => "ONE_ON_ONE",
            Self::StatusUpdate => "STATUS_UPDATE",
            Self::Review => "REVIEW",
            Self::Brainstorming => "BRAINSTORMING",
            Self::CheckIn => "CHECK_IN",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Explicit attendance requirement carried on an event. Absent or
/// unrecognized values normalize to `Flexible`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceMode {
    MustBeInOffice,
    CanBeRemote,
    #[default]
    #[serde(other)]
    Flexible,
}

impl AttendanceMode {
    pub fn parse(value: &str) -> Self {
        match value {
            "MUST_BE_IN_OFFICE" | "MUST_BE_IN_PERSON" => Self::MustBeInOffice,
            "CAN_BE_REMOTE" => Self::CanBeRemote,
            _ => Self::Flexible,
        }
    }
}

/// A normalized calendar event. Sourced externally; read-only within the
/// pipeline. All-day events carry no timestamps and are treated as
/// non-meetings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub attendee_count: u32,
    #[serde(default = "MeetingType::unknown")]
    pub meeting_type: MeetingType,
    #[serde(default)]
    pub attendance_mode: AttendanceMode,
    #[serde(default)]
    pub is_all_day: bool,
}

impl MeetingType {
    fn unknown() -> Self {
        Self::Unknown
    }
}

// =============================================================================
// Classification
// =============================================================================

/// How sure the classifier is about an office/remote decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Office/remote decision for a single meeting. Created once per run, never
/// mutated afterward.
///
/// `start_hour`/`end_hour` are decimal hours on the target date in the
/// requesting user's timezone, precomputed so the presence rules never redo
/// zone math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingClassification {
    pub meeting_id: String,
    pub summary: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_hour: f64,
    pub end_hour: f64,
    pub requires_office: bool,
    pub confidence: Confidence,
    pub reason: String,
    pub meeting_type: MeetingType,
    pub attendee_count: u32,
    pub duration_minutes: i64,
}

// =============================================================================
// Presence candidates
// =============================================================================

/// Strategy label for a candidate office-attendance window.
///
/// Wire names keep the original long forms so stored plans stay readable by
/// downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockKind {
    FullDayOffice,
    StrategicMorning,
    StrategicAfternoon,
    CoreHoursPresence,
    #[serde(rename = "POLICY_REQUIRED_OFFICE_PRESENCE")]
    PolicyRequired,
    #[serde(rename = "FULL_REMOTE_RECOMMENDED")]
    FullRemote,
}

impl BlockKind {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::FullRemote)
    }
}

/// Verdict of one business rule check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Pass,
    Warning,
    Fail,
    Required,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warning => "WARNING",
            Self::Fail => "FAIL",
            Self::Required => "REQUIRED",
        }
    }
}

/// One business-rule verdict with its human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCheck {
    pub status: RuleStatus,
    pub message: String,
}

impl RuleCheck {
    pub fn pass(message: impl Into<String>) -> Self {
        Self { status: RuleStatus::Pass, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { status: RuleStatus::Warning, message: message.into() }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { status: RuleStatus::Fail, message: message.into() }
    }

    pub fn required(message: impl Into<String>) -> Self {
        Self { status: RuleStatus::Required, message: message.into() }
    }
}

/// Arrival/departure window in decimal hours on the target date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OfficeWindow {
    pub arrival_hour: f64,
    pub departure_hour: f64,
}

impl OfficeWindow {
    pub fn new(arrival_hour: f64, departure_hour: f64) -> Self {
        Self { arrival_hour, departure_hour }
    }

    pub fn duration_hours(&self) -> f64 {
        self.departure_hour - self.arrival_hour
    }
}

/// Office blocks always carry a window; the remote block never does, so no
/// scoring code has to check nullable hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresenceWindow {
    Office(OfficeWindow),
    Remote,
}

/// A candidate office-attendance plan for the day.
///
/// Invariant: `office_meetings ∪ remote_meetings` covers every input
/// classification exactly once, membership decided by meeting id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceBlock {
    pub kind: BlockKind,
    pub window: PresenceWindow,
    pub office_meetings: Vec<MeetingClassification>,
    pub remote_meetings: Vec<MeetingClassification>,
    pub compliance: BTreeMap<String, RuleCheck>,
    pub compliance_score: i32,
    pub is_valid: bool,
    pub force_include: bool,
    pub warnings: Vec<String>,
    pub uncovered_critical_meetings: Vec<String>,
}

impl PresenceBlock {
    pub fn office_window(&self) -> Option<&OfficeWindow> {
        match &self.window {
            PresenceWindow::Office(w) => Some(w),
            PresenceWindow::Remote => None,
        }
    }
}

// =============================================================================
// Commute options
// =============================================================================

/// Commute overhead vs productive office time for a resolved option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyMetrics {
    pub total_commute_minutes: i64,
    pub office_minutes: i64,
    pub total_day_minutes: i64,
    pub commute_to_office_ratio: f64,
    pub day_efficiency: f64,
}

/// One leg of a commute, as reported by the travel estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommuteLeg {
    pub duration_text: String,
    pub route: String,
    pub traffic_conditions: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommuteDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morning: Option<CommuteLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evening: Option<CommuteLeg>,
}

/// A presence block resolved into concrete timezone-correct timestamps.
///
/// Invariant for non-remote options:
/// `commute_start < office_arrival < office_departure < commute_end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommuteOption {
    pub kind: BlockKind,
    pub commute_start: Option<DateTime<Utc>>,
    pub office_arrival: Option<DateTime<Utc>>,
    pub office_departure: Option<DateTime<Utc>>,
    pub commute_end: Option<DateTime<Utc>>,
    pub office_duration: String,
    pub office_meetings: Vec<MeetingClassification>,
    pub remote_meetings: Vec<MeetingClassification>,
    pub compliance: BTreeMap<String, RuleCheck>,
    pub commute_details: CommuteDetails,
    pub efficiency: EfficiencyMetrics,
    pub warnings: Vec<String>,
    pub compliance_score: i32,
}

// =============================================================================
// Recommendations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfessionalImpact {
    VeryPositive,
    NeutralToPositive,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamVisibility {
    High,
    Medium,
    Low,
}

/// Professional-perception judgment attached to a ranked option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptionAnalysis {
    pub professional_impact: ProfessionalImpact,
    pub reasoning: String,
    pub team_visibility: TeamVisibility,
}

/// Pros/cons/cost summary for a ranked option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOffs {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub cost_impact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_investment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency_score: Option<String>,
}

/// A ranked, annotated commute option. Created once at the final stage;
/// immutable. Ranks are 1-based, unique, contiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub option_rank: u32,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub commute_start: Option<DateTime<Utc>>,
    pub office_arrival: Option<DateTime<Utc>>,
    pub office_departure: Option<DateTime<Utc>>,
    pub commute_end: Option<DateTime<Utc>>,
    pub office_duration: String,
    pub office_meetings: Vec<String>,
    pub remote_meetings: Vec<String>,
    pub business_rule_compliance: BTreeMap<String, String>,
    pub perception_analysis: PerceptionAnalysis,
    pub reasoning: String,
    pub trade_offs: TradeOffs,
}

// =============================================================================
// Jobs and results
// =============================================================================

/// Lifecycle status of a planning job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

/// Queue ingress message. `input_data` may arrive as a JSON object or a
/// JSON-encoded string; `crate::normalize` flattens it before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMessage {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub target_date: String,
    #[serde(default)]
    pub input_data: serde_json::Value,
}

/// Immutable description of one planning job, created by the dispatcher when
/// a queue message is accepted.
#[derive(Debug, Clone)]
pub struct PlanningRequest {
    pub job_id: String,
    pub user_id: String,
    pub target_date: NaiveDate,
    pub user_timezone: Tz,
}

/// Stage counts reported alongside a successful plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub calendar_events_analyzed: usize,
    pub meetings_classified: usize,
    pub office_options_evaluated: usize,
    pub total_options_generated: usize,
    pub final_recommendations: usize,
}

/// Stage counts retained when a job fails partway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialCounts {
    pub calendar_events: usize,
    pub meeting_classifications: usize,
    pub presence_blocks: usize,
    pub commute_options: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanningSuccess {
    pub job_id: String,
    pub user_id: String,
    pub target_date: String,
    pub recommendations: Vec<Recommendation>,
    pub workflow_summary: WorkflowSummary,
    pub execution_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanningFailure {
    pub job_id: String,
    pub user_id: String,
    pub target_date: String,
    pub error_message: String,
    pub error_kind: ErrorKind,
    pub failed_at_step: String,
    pub progress_when_failed: f64,
    pub partial_results: PartialCounts,
    pub execution_time: DateTime<Utc>,
}

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanningOutcome {
    Success(PlanningSuccess),
    Error(PlanningFailure),
}

impl PlanningOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        match self {
            Self::Success(s) => &s.recommendations,
            Self::Error(_) => &[],
        }
    }
}

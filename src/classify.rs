//! Meeting classification: office-required vs remote-viable.
//!
//! Decision procedure, first rule wins:
//! 1. Explicit attendance mode on the event
//! 2. Known meeting type in the office-required or remote-friendly set
//! 3. Weighted keyword/context scoring over summary, description, attendee
//!    count, location hints, and duration; ties default to remote-friendly

use chrono_tz::Tz;

use crate::rules::decimal_hour;
use crate::types::{
    AttendanceMode, CalendarEvent, Confidence, MeetingClassification, MeetingType,
};

const OFFICE_REQUIRED_KEYWORDS: &[&str] = &[
    "client",
    "presentation",
    "demo",
    "interview",
    "workshop",
    "stakeholder",
    "board",
    "executive",
    "pitch",
    "contract",
    "signing",
    "negotiation",
    "training",
    "onboarding",
    "all-hands",
    "town hall",
    "offsite",
];

const REMOTE_FRIENDLY_KEYWORDS: &[&str] = &[
    "1:1",
    "one-on-one",
    "standup",
    "sync",
    "check-in",
    "retrospective",
    "brainstorm",
    "code review",
    "planning",
    "backlog",
    "refinement",
];

/// Weight of a keyword hit relative to the contextual signals.
const KEYWORD_WEIGHT: i32 = 2;

/// Attendee thresholds: big meetings lean office, tiny ones lean remote.
const LARGE_MEETING_ATTENDEES: u32 = 8;
const SMALL_MEETING_ATTENDEES: u32 = 2;

/// Meetings at least this long lean office.
const LONG_MEETING_HOURS: f64 = 3.0;

fn office_required_type(meeting_type: MeetingType) -> bool {
    matches!(
        meeting_type,
        MeetingType::ClientMeeting
            | MeetingType::Presentation
            | MeetingType::TeamWorkshop
            | MeetingType::Interview
            | MeetingType::StakeholderMeeting
    )
}

fn remote_friendly_type(meeting_type: MeetingType) -> bool {
    matches!(
        meeting_type,
        MeetingType::OneOnOne
            | MeetingType::StatusUpdate
            | MeetingType::Review
            | MeetingType::Brainstorming
            | MeetingType::CheckIn
    )
}

/// Classify every event, preserving input order. Events without timestamps
/// were already excluded by schedule analysis; any stragglers are skipped.
pub fn classify_events(events: &[CalendarEvent], tz: Tz) -> Vec<MeetingClassification> {
    events
        .iter()
        .filter_map(|event| classify_event(event, tz))
        .collect()
}

/// Classify a single meeting for office vs remote attendance.
pub fn classify_event(event: &CalendarEvent, tz: Tz) -> Option<MeetingClassification> {
    let (start, end) = match (event.start_time, event.end_time) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            log::debug!("Skipping event {} without timestamps", event.id);
            return None;
        }
    };

    let duration_minutes = (end - start).num_minutes();
    let duration_hours = duration_minutes as f64 / 60.0;

    let (requires_office, confidence, reason) = match event.attendance_mode {
        AttendanceMode::MustBeInOffice => (
            true,
            Confidence::High,
            "Explicitly marked as office-required".to_string(),
        ),
        AttendanceMode::CanBeRemote => (
            false,
            Confidence::High,
            "Explicitly marked as remote-friendly".to_string(),
        ),
        AttendanceMode::Flexible => {
            if office_required_type(event.meeting_type) {
                (
                    true,
                    Confidence::High,
                    format!(
                        "Meeting type {} requires office presence",
                        event.meeting_type.as_str()
                    ),
                )
            } else if remote_friendly_type(event.meeting_type) {
                (
                    false,
                    Confidence::High,
                    format!("Meeting type {} can be remote", event.meeting_type.as_str()),
                )
            } else {
                score_by_context(event, duration_hours)
            }
        }
    };

    Some(MeetingClassification {
        meeting_id: event.id.clone(),
        summary: event.summary.clone(),
        start_time: start,
        end_time: end,
        start_hour: decimal_hour(&start.with_timezone(&tz)),
        end_hour: decimal_hour(&end.with_timezone(&tz)),
        requires_office,
        confidence,
        reason,
        meeting_type: event.meeting_type,
        attendee_count: event.attendee_count,
        duration_minutes,
    })
}

/// Weighted keyword/context scoring for meetings with no explicit signal.
fn score_by_context(event: &CalendarEvent, duration_hours: f64) -> (bool, Confidence, String) {
    let summary = event.summary.to_lowercase();
    let description = event.description.to_lowercase();
    let location = event.location.to_lowercase();

    let mut office_score = 0;
    let mut remote_score = 0;
    let mut reasons: Vec<String> = Vec::new();

    for keyword in OFFICE_REQUIRED_KEYWORDS {
        if summary.contains(keyword) || description.contains(keyword) {
            office_score += KEYWORD_WEIGHT;
            reasons.push(format!("Contains keyword '{}'", keyword));
        }
    }
    for keyword in REMOTE_FRIENDLY_KEYWORDS {
        if summary.contains(keyword) || description.contains(keyword) {
            remote_score += KEYWORD_WEIGHT;
            reasons.push(format!("Contains remote-friendly keyword '{}'", keyword));
        }
    }

    if event.attendee_count >= LARGE_MEETING_ATTENDEES {
        office_score += 1;
        reasons.push(format!("Large meeting ({} attendees)", event.attendee_count));
    } else if event.attendee_count <= SMALL_MEETING_ATTENDEES {
        remote_score += 1;
        reasons.push(format!("Small meeting ({} attendees)", event.attendee_count));
    }

    if location.contains("conference") || location.contains("room") {
        office_score += 1;
        reasons.push("Conference room booked".to_string());
    } else if location.contains("zoom") || location.contains("meet") || location.contains("teams") {
        remote_score += 1;
        reasons.push("Virtual meeting platform specified".to_string());
    }

    if duration_hours >= LONG_MEETING_HOURS {
        office_score += 1;
        reasons.push(format!("Long meeting ({:.1} hours)", duration_hours));
    }

    // Ties default to remote-friendly
    let requires_office = office_score > remote_score;
    let margin = (office_score - remote_score).abs();
    let confidence = if margin >= 2 {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    let reason = if reasons.is_empty() {
        "Default to remote-friendly".to_string()
    } else {
        reasons
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join("; ")
    };

    (requires_office, confidence, reason)
}

/// Distribution summary, logged after the classification stage.
#[derive(Debug, Clone)]
pub struct ClassificationSummary {
    pub total_meetings: usize,
    pub office_required: usize,
    pub remote_friendly: usize,
    pub high_confidence: usize,
    pub office_meeting_minutes: i64,
    pub remote_meeting_minutes: i64,
}

pub fn summarize(classifications: &[MeetingClassification]) -> ClassificationSummary {
    let office_required = classifications.iter().filter(|c| c.requires_office).count();
    ClassificationSummary {
        total_meetings: classifications.len(),
        office_required,
        remote_friendly: classifications.len() - office_required,
        high_confidence: classifications
            .iter()
            .filter(|c| c.confidence == Confidence::High)
            .count(),
        office_meeting_minutes: classifications
            .iter()
            .filter(|c| c.requires_office)
            .map(|c| c.duration_minutes)
            .sum(),
        remote_meeting_minutes: classifications
            .iter()
            .filter(|c| !c.requires_office)
            .map(|c| c.duration_minutes)
            .sum(),
    }
}

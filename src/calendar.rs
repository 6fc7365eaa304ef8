//! Calendar event sourcing.
//!
//! The schedule-analysis stage reads events from the job store first and
//! falls back to a `CalendarProvider`. The built-in `DemoCalendar` generates
//! a deterministic, realistic day per `(user, date)` so the pipeline can run
//! end to end without any external calendar.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::error::PlanError;
use crate::types::{AttendanceMode, CalendarEvent, MeetingType};
use crate::util::{short_digest, stable_hash};

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Events for a user on a calendar date, chronologically ordered.
    async fn get_events(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, PlanError>;
}

struct MeetingTemplate {
    summary: &'static str,
    description: &'static str,
    meeting_type: MeetingType,
    attendance_mode: AttendanceMode,
    duration_minutes: i64,
    attendees: u32,
}

const MEETING_TEMPLATES: &[MeetingTemplate] = &[
    // Must be in-office meetings
    MeetingTemplate {
        summary: "Q4 Client Presentation - Acme Corp",
        description: "Quarterly business review with Acme Corp leadership team",
        meeting_type: MeetingType::ClientMeeting,
        attendance_mode: AttendanceMode::MustBeInOffice,
        duration_minutes: 120,
        attendees: 8,
    },
    MeetingTemplate {
        summary: "Product Demo - Enterprise Customer",
        description: "Live product demonstration for potential enterprise customer",
        meeting_type: MeetingType::Presentation,
        attendance_mode: AttendanceMode::MustBeInOffice,
        duration_minutes: 90,
        attendees: 6,
    },
    MeetingTemplate {
        summary: "Team Workshop - Sprint Planning",
        description: "In-person collaborative sprint planning session",
        meeting_type: MeetingType::TeamWorkshop,
        attendance_mode: AttendanceMode::MustBeInOffice,
        duration_minutes: 180,
        attendees: 12,
    },
    MeetingTemplate {
        summary: "Senior Engineer Interview",
        description: "On-site technical interview with candidate",
        meeting_type: MeetingType::Interview,
        attendance_mode: AttendanceMode::MustBeInOffice,
        duration_minutes: 240,
        attendees: 4,
    },
    // Can be remote meetings
    MeetingTemplate {
        summary: "1:1 with Sarah (Manager)",
        description: "Weekly check-in with direct manager",
        meeting_type: MeetingType::OneOnOne,
        attendance_mode: AttendanceMode::CanBeRemote,
        duration_minutes: 30,
        attendees: 2,
    },
    MeetingTemplate {
        summary: "Daily Standup - Dev Team",
        description: "Daily team sync and status update",
        meeting_type: MeetingType::StatusUpdate,
        attendance_mode: AttendanceMode::CanBeRemote,
        duration_minutes: 15,
        attendees: 8,
    },
    MeetingTemplate {
        summary: "Code Review Session",
        description: "Review pull requests from current sprint",
        meeting_type: MeetingType::Review,
        attendance_mode: AttendanceMode::CanBeRemote,
        duration_minutes: 60,
        attendees: 4,
    },
    MeetingTemplate {
        summary: "Feature Brainstorming Call",
        description: "Collaborative brainstorming for new feature ideas",
        meeting_type: MeetingType::Brainstorming,
        attendance_mode: AttendanceMode::CanBeRemote,
        duration_minutes: 60,
        attendees: 6,
    },
    MeetingTemplate {
        summary: "Weekly Check-in - Product Team",
        description: "Regular product team sync",
        meeting_type: MeetingType::CheckIn,
        attendance_mode: AttendanceMode::CanBeRemote,
        duration_minutes: 30,
        attendees: 5,
    },
];

const START_MINUTES: &[u32] = &[0, 15, 30, 45];

/// Deterministic demo calendar: same `(user, date)` always yields the same
/// day of 2–4 meetings between 8 AM and 6 PM.
pub struct DemoCalendar;

#[async_trait]
impl CalendarProvider for DemoCalendar {
    async fn get_events(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, PlanError> {
        let seed = stable_hash(&format!("{}_{}", user_id, date));
        let num_meetings = 2 + (seed % 3) as usize;

        let mut events = Vec::new();
        let mut used_hours = Vec::new();

        for i in 0..num_meetings {
            let slot_seed = stable_hash(&format!("{}_{}_{}", user_id, date, i));
            let template = &MEETING_TEMPLATES[(slot_seed % MEETING_TEMPLATES.len() as u64) as usize];

            // Start between 8 AM and 5 PM on a quarter-hour boundary
            let start_hour = 8 + ((slot_seed >> 8) % 10) as u32;
            let start_minute = START_MINUTES[((slot_seed >> 16) % 4) as usize];
            if used_hours.contains(&start_hour) {
                continue;
            }
            used_hours.push(start_hour);

            let start = date
                .and_hms_opt(start_hour, start_minute, 0)
                .ok_or_else(|| PlanError::Input(format!("Invalid demo slot {}:00", start_hour)))?
                .and_utc();
            let end = start + Duration::minutes(template.duration_minutes);

            events.push(CalendarEvent {
                id: format!("demo_{}_{}", short_digest(&format!("{}_{}", user_id, date)), i),
                summary: template.summary.to_string(),
                description: template.description.to_string(),
                start_time: Some(start),
                end_time: Some(end),
                location: if template.attendance_mode == AttendanceMode::MustBeInOffice {
                    "Conference Room A".to_string()
                } else {
                    "Zoom".to_string()
                },
                attendee_count: template.attendees,
                meeting_type: template.meeting_type,
                attendance_mode: template.attendance_mode,
                is_all_day: false,
            });
        }

        events.sort_by_key(|e| e.start_time);
        log::info!(
            "DemoCalendar: generated {} events for user {} on {}",
            events.len(),
            user_id,
            date
        );
        Ok(events)
    }
}

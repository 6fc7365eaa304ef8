//! Schedule analysis: the first pipeline stage.
//!
//! Fetches the day's calendar events (job store first, provider fallback),
//! sanitizes them, and computes the meeting-pattern summary that gets logged
//! with the run. All-day and timestamp-less events are treated as
//! non-meetings; an inverted interval is repaired with a one-hour default
//! duration rather than aborting the job.

use std::sync::Arc;

use chrono::Duration;
use chrono_tz::Tz;

use crate::calendar::CalendarProvider;
use crate::error::PlanError;
use crate::rules::decimal_hour;
use crate::store::JobStore;
use crate::types::{CalendarEvent, PlanningRequest};

/// Working-day canvas for free-block detection, decimal hours.
const DAY_START_HOUR: f64 = 8.0;
const DAY_END_HOUR: f64 = 18.0;

/// Fallback duration for events with an inverted or zero-length interval.
const DEFAULT_MEETING_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingBlock {
    pub start_hour: f64,
    pub end_hour: f64,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreeBlock {
    pub start_hour: f64,
    pub end_hour: f64,
}

/// Meeting-pattern summary for one day.
#[derive(Debug, Clone)]
pub struct ScheduleAnalysis {
    pub total_meeting_minutes: i64,
    pub meeting_blocks: Vec<MeetingBlock>,
    pub free_blocks: Vec<FreeBlock>,
    pub earliest_meeting_hour: Option<f64>,
    pub latest_meeting_hour: Option<f64>,
    /// Meetings per 10-hour workday.
    pub meeting_density: f64,
}

/// Fetch events for the request: stored events win, the provider fills in
/// when the store has none.
pub async fn fetch_events(
    request: &PlanningRequest,
    store: &Arc<parking_lot::Mutex<JobStore>>,
    provider: &dyn CalendarProvider,
) -> Result<Vec<CalendarEvent>, PlanError> {
    let stored = {
        let store = store.lock();
        store
            .get_calendar_events(&request.user_id, request.target_date)
            .map_err(|e| PlanError::Collaborator(format!("Calendar store query failed: {}", e)))?
    };

    if !stored.is_empty() {
        log::info!("Found {} events in store for {}", stored.len(), request.user_id);
        return Ok(stored);
    }

    log::info!("No stored events for {}, querying calendar provider", request.user_id);
    provider
        .get_events(&request.user_id, request.target_date)
        .await
}

/// Drop non-meetings and repair malformed intervals in place of failing.
pub fn sanitize_events(events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
    let mut sanitized = Vec::with_capacity(events.len());
    for mut event in events {
        if event.is_all_day {
            log::debug!("Skipping all-day event {}", event.id);
            continue;
        }
        let (start, end) = match (event.start_time, event.end_time) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                log::warn!("Skipping event {} without usable timestamps", event.id);
                continue;
            }
        };
        if end <= start {
            log::warn!(
                "Event {} has end <= start, substituting {}-minute duration",
                event.id,
                DEFAULT_MEETING_MINUTES
            );
            event.end_time = Some(start + Duration::minutes(DEFAULT_MEETING_MINUTES));
        }
        sanitized.push(event);
    }
    sanitized
}

/// Meeting distribution over the day, in the user's timezone.
pub fn analyze_patterns(events: &[CalendarEvent], tz: Tz) -> ScheduleAnalysis {
    let mut total_meeting_minutes = 0;
    let mut meeting_blocks = Vec::new();
    let mut earliest: Option<f64> = None;
    let mut latest: Option<f64> = None;

    for event in events {
        let (Some(start), Some(end)) = (event.start_time, event.end_time) else {
            continue;
        };
        let start_hour = decimal_hour(&start.with_timezone(&tz));
        let end_hour = decimal_hour(&end.with_timezone(&tz));
        let duration_minutes = (end - start).num_minutes();
        total_meeting_minutes += duration_minutes;
        meeting_blocks.push(MeetingBlock { start_hour, end_hour, duration_minutes });

        earliest = Some(earliest.map_or(start_hour, |e: f64| e.min(start_hour)));
        latest = Some(latest.map_or(end_hour, |l: f64| l.max(end_hour)));
    }

    let free_blocks = identify_free_blocks(&meeting_blocks);

    ScheduleAnalysis {
        total_meeting_minutes,
        free_blocks,
        earliest_meeting_hour: earliest,
        latest_meeting_hour: latest,
        meeting_density: meeting_blocks.len() as f64 / 10.0,
        meeting_blocks,
    }
}

/// Free time between meetings over the 8:00–18:00 canvas.
fn identify_free_blocks(meetings: &[MeetingBlock]) -> Vec<FreeBlock> {
    if meetings.is_empty() {
        return vec![FreeBlock { start_hour: DAY_START_HOUR, end_hour: DAY_END_HOUR }];
    }

    let mut sorted: Vec<&MeetingBlock> = meetings.iter().collect();
    sorted.sort_by(|a, b| a.start_hour.total_cmp(&b.start_hour));

    let mut free = Vec::new();
    let mut cursor = DAY_START_HOUR;
    for meeting in sorted {
        if meeting.start_hour > cursor {
            free.push(FreeBlock { start_hour: cursor, end_hour: meeting.start_hour });
        }
        cursor = cursor.max(meeting.end_hour);
    }
    if cursor < DAY_END_HOUR {
        free.push(FreeBlock { start_hour: cursor, end_hour: DAY_END_HOUR });
    }
    free
}

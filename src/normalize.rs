//! Input and event normalization.
//!
//! Queue payloads and stored calendar rows arrive in more than one shape:
//! `input_data` may be a JSON object or a JSON-encoded string, event rows may
//! use camelCase (backend origin) or snake_case (provider origin), attendees
//! may be an array, a count, or a bare string. Everything funnels through
//! here before the pipeline sees it. Malformed events degrade to a safe
//! fallback instead of aborting the job.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::PlanError;
use crate::types::{AttendanceMode, CalendarEvent, MeetingType};

/// Flatten `input_data` into a JSON object.
///
/// Accepts an object as-is, parses a JSON-encoded string, and demotes
/// anything else to `{"raw_input": …}` with a warning.
pub fn normalize_input_data(raw: &Value) -> Value {
    match raw {
        Value::Object(_) => raw.clone(),
        Value::Null => Value::Object(serde_json::Map::new()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Value::Object(map),
            _ => {
                log::warn!("input_data is not valid JSON, keeping as raw string");
                serde_json::json!({ "raw_input": s })
            }
        },
        other => {
            log::warn!("Unexpected input_data type, keeping as raw string");
            serde_json::json!({ "raw_input": other.to_string() })
        }
    }
}

/// Pull `context.user_timezone` out of normalized input data.
pub fn user_timezone_from_input(input: &Value) -> Option<&str> {
    input
        .get("context")?
        .get("user_timezone")?
        .as_str()
        .filter(|s| !s.is_empty())
}

/// Parse a timestamp in any of the shapes the collaborators emit:
/// RFC 3339 with offset, with a trailing `Z`, or naive (assumed UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive timestamps ("2025-03-11T09:00:00") are treated as UTC.
    if let Ok(naive) = value.parse::<NaiveDateTime>() {
        return Some(naive.and_utc());
    }
    None
}

/// Parse a target date, accepting a plain date or a full timestamp.
pub fn parse_target_date(value: &str) -> Result<NaiveDate, PlanError> {
    if let Ok(date) = value.parse::<NaiveDate>() {
        return Ok(date);
    }
    if let Some(dt) = parse_timestamp(value) {
        return Ok(dt.date_naive());
    }
    Err(PlanError::Input(format!("Unparseable target date: {}", value)))
}

/// Normalize a raw event payload into a `CalendarEvent`.
///
/// Handles both camelCase and snake_case field names. A payload that cannot
/// be normalized yields the fallback event (no timestamps, so it is treated
/// as a non-meeting downstream) rather than an error.
pub fn normalize_event(raw: &Value) -> CalendarEvent {
    let Some(map) = raw.as_object() else {
        log::warn!("Event payload is not an object, substituting fallback event");
        return fallback_event(raw);
    };

    let field = |snake: &str, camel: &str| -> Option<&Value> {
        map.get(snake).or_else(|| map.get(camel))
    };
    let string_field = |snake: &str, camel: &str| -> String {
        field(snake, camel)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let id = string_field("id", "id");
    let start_time = field("start_time", "startTime")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    let end_time = field("end_time", "endTime")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);

    if start_time.is_none() || end_time.is_none() {
        log::warn!("Event {} missing timestamps, treating as non-meeting", id);
    }

    CalendarEvent {
        id,
        summary: string_field("summary", "summary"),
        description: string_field("description", "description"),
        start_time,
        end_time,
        location: string_field("location", "location"),
        attendee_count: attendee_count(field("attendees", "attendees"))
            .or_else(|| {
                field("attendee_count", "attendeeCount")
                    .and_then(Value::as_u64)
                    .map(|n| n as u32)
            })
            .unwrap_or(0),
        meeting_type: field("meeting_type", "meetingType")
            .and_then(Value::as_str)
            .map(MeetingType::parse)
            .unwrap_or(MeetingType::Unknown),
        attendance_mode: field("attendance_mode", "attendanceMode")
            .and_then(Value::as_str)
            .map(AttendanceMode::parse)
            .unwrap_or_default(),
        is_all_day: field("is_all_day", "isAllDay")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Attendees arrive as an array of objects, a bare email string, or a
/// JSON-encoded array. Reduce all of them to a count.
fn attendee_count(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Array(items) => Some(items.len() as u32),
        Value::String(s) => {
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
                Some(items.len() as u32)
            } else if s.is_empty() {
                Some(0)
            } else {
                Some(1)
            }
        }
        _ => None,
    }
}

/// Safe stand-in for an event that could not be normalized.
fn fallback_event(raw: &Value) -> CalendarEvent {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("fallback_event")
        .to_string();
    CalendarEvent {
        id,
        summary: "Event processing error".to_string(),
        description: "This event could not be processed correctly".to_string(),
        start_time: None,
        end_time: None,
        location: String::new(),
        attendee_count: 0,
        meeting_type: MeetingType::Unknown,
        attendance_mode: AttendanceMode::Flexible,
        is_all_day: false,
    }
}

//! Time-rule primitives for business-rule evaluation.
//!
//! All functions here are pure: decimal-hour arithmetic, window overlap,
//! coverage checks, and display formatting. Decimal hours are hours since
//! local midnight (8.5 == 8:30 AM).

use chrono::Timelike;

/// Decimal hour of a timestamp (hour + minute/60).
pub fn decimal_hour<T: Timelike>(time: &T) -> f64 {
    f64::from(time.hour()) + f64::from(time.minute()) / 60.0
}

/// Overlap between two hour windows, in hours. Zero when disjoint.
pub fn overlap_hours(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

/// True when `[arrival, departure]` covers `[start, end]` with at least
/// `buffer` hours of slack on both sides.
pub fn covers_with_buffer(arrival: f64, departure: f64, start: f64, end: f64, buffer: f64) -> bool {
    arrival <= start - buffer && departure >= end + buffer
}

/// Format a decimal hour as a 12-hour clock string (8.5 -> "8:30 AM").
pub fn hour_to_clock(hour: f64) -> String {
    let total_minutes = (hour * 60.0).round() as i64;
    let h = (total_minutes / 60).rem_euclid(24);
    let m = total_minutes % 60;
    let period = if h < 12 { "AM" } else { "PM" };
    let display_hour = match h % 12 {
        0 => 12,
        other => other,
    };
    format!("{}:{:02} {}", display_hour, m, period)
}

/// Format a minute count as a human-readable duration
/// (510 -> "8 hours 30 minutes").
pub fn format_duration_minutes(minutes: i64) -> String {
    let hours = minutes / 60;
    let rem = minutes % 60;
    match (hours, rem) {
        (0, m) => format!("{} minutes", m),
        (h, 0) => format!("{} hours", h),
        (h, m) => format!("{} hours {} minutes", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_decimal_hour() {
        let t = NaiveTime::from_hms_opt(8, 30, 0).unwrap();
        assert!((decimal_hour(&t) - 8.5).abs() < f64::EPSILON);
        let t = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert_eq!(decimal_hour(&t), 0.0);
    }

    #[test]
    fn test_overlap_hours() {
        // Window inside core hours
        assert!((overlap_hours(9.0, 17.0, 10.0, 16.0) - 6.0).abs() < f64::EPSILON);
        // Partial overlap
        assert!((overlap_hours(8.0, 12.0, 10.0, 16.0) - 2.0).abs() < f64::EPSILON);
        // Disjoint clamps to zero
        assert_eq!(overlap_hours(6.0, 9.0, 10.0, 16.0), 0.0);
    }

    #[test]
    fn test_covers_with_buffer() {
        assert!(covers_with_buffer(9.0, 13.0, 10.0, 12.0, 0.5));
        // Arrival too late for the buffer
        assert!(!covers_with_buffer(9.75, 13.0, 10.0, 12.0, 0.5));
        // Departure too early for the buffer
        assert!(!covers_with_buffer(9.0, 12.25, 10.0, 12.0, 0.5));
    }

    #[test]
    fn test_hour_to_clock() {
        assert_eq!(hour_to_clock(8.5), "8:30 AM");
        assert_eq!(hour_to_clock(0.0), "12:00 AM");
        assert_eq!(hour_to_clock(12.0), "12:00 PM");
        assert_eq!(hour_to_clock(17.5), "5:30 PM");
        assert_eq!(hour_to_clock(9.75), "9:45 AM");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration_minutes(45), "45 minutes");
        assert_eq!(format_duration_minutes(480), "8 hours");
        assert_eq!(format_duration_minutes(510), "8 hours 30 minutes");
    }
}

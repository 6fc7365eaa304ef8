//! Commute timing optimization.
//!
//! Resolves each presence block's decimal hours into timezone-correct
//! instants on the target date (the user's zone, not the server's), queries
//! the travel estimator for both legs, and derives efficiency metrics.
//! Estimator failures degrade the affected option to a canonical 8-hour day
//! with a warning; they never fail the job.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;

use crate::error::PlanError;
use crate::rules::format_duration_minutes;
use crate::travel::{TravelEstimator, TravelTiming};
use crate::types::{
    CommuteDetails, CommuteLeg, CommuteOption, EfficiencyMetrics, OfficeWindow, PlanningRequest,
    PresenceBlock, PresenceWindow,
};

/// Remote days are reported against a standard 8-hour working day.
const REMOTE_DAY_MINUTES: i64 = 480;

/// Canonical fallback day when the estimator is unavailable.
const FALLBACK_ARRIVAL_HOUR: f64 = 9.0;
const FALLBACK_DEPARTURE_HOUR: f64 = 17.0;
const FALLBACK_LEG_MINUTES: i64 = 45;

/// Resolve every presence block into a concrete commute option.
pub async fn optimize_commute(
    blocks: &[PresenceBlock],
    request: &PlanningRequest,
    travel: &dyn TravelEstimator,
    cancel: &watch::Receiver<bool>,
) -> Result<Vec<CommuteOption>, PlanError> {
    let mut options = Vec::with_capacity(blocks.len());
    for block in blocks {
        if *cancel.borrow() {
            return Err(PlanError::Cancelled);
        }
        let option = match &block.window {
            PresenceWindow::Remote => remote_option(block),
            PresenceWindow::Office(window) => {
                match office_option(block, *window, request, travel).await {
                    Ok(option) => option,
                    Err(PlanError::Cancelled) => return Err(PlanError::Cancelled),
                    Err(e) => {
                        log::warn!(
                            "Commute optimization for {:?} block degraded: {}",
                            block.kind,
                            e
                        );
                        fallback_option(block, request)
                    }
                }
            }
        };
        options.push(option);
    }
    log::info!("Generated {} optimized commute options", options.len());
    Ok(options)
}

async fn office_option(
    block: &PresenceBlock,
    window: OfficeWindow,
    request: &PlanningRequest,
    travel: &dyn TravelEstimator,
) -> Result<CommuteOption, PlanError> {
    let office_arrival = zoned_instant(
        request.target_date,
        window.arrival_hour,
        request.user_timezone,
    )?;
    let office_departure = zoned_instant(
        request.target_date,
        window.departure_hour,
        request.user_timezone,
    )?;
    if office_departure <= office_arrival {
        return Err(PlanError::Input(format!(
            "Departure {} is not after arrival {}",
            office_departure, office_arrival
        )));
    }

    let outbound = travel
        .optimal_departure(&request.user_id, "home", "office", office_arrival)
        .await?;
    let inbound = travel
        .route_duration(
            &request.user_id,
            "office",
            "home",
            TravelTiming::DepartAt(office_departure),
        )
        .await?;

    let commute_start = outbound.optimal_departure;
    let commute_end = office_departure + Duration::seconds(inbound.duration_secs);
    if commute_start >= office_arrival {
        return Err(PlanError::Collaborator(format!(
            "Estimator returned departure {} at or after arrival {}",
            commute_start, office_arrival
        )));
    }

    Ok(build_option(
        block,
        commute_start,
        office_arrival,
        office_departure,
        commute_end,
        CommuteDetails {
            morning: Some(CommuteLeg {
                duration_text: outbound.travel.duration_text.clone(),
                route: outbound.travel.route_label.clone(),
                traffic_conditions: outbound.travel.traffic_label.clone(),
            }),
            evening: Some(CommuteLeg {
                duration_text: inbound.duration_text,
                route: inbound.route_label,
                traffic_conditions: inbound.traffic_label,
            }),
        },
        block.warnings.clone(),
    ))
}

/// Canonical 8-hour day with assumed legs, used when the estimator is
/// unavailable or returns garbage.
fn fallback_option(block: &PresenceBlock, request: &PlanningRequest) -> CommuteOption {
    let office_arrival = zoned_instant(
        request.target_date,
        FALLBACK_ARRIVAL_HOUR,
        request.user_timezone,
    )
    .unwrap_or_else(|_| utc_at(request.target_date, 9, 0));
    let office_departure = zoned_instant(
        request.target_date,
        FALLBACK_DEPARTURE_HOUR,
        request.user_timezone,
    )
    .unwrap_or_else(|_| utc_at(request.target_date, 17, 0));

    let leg = Duration::minutes(FALLBACK_LEG_MINUTES);
    let mut warnings = block.warnings.clone();
    warnings.push("Commute optimization degraded; using standard day estimates".to_string());

    build_option(
        block,
        office_arrival - leg,
        office_arrival,
        office_departure,
        office_departure + leg,
        CommuteDetails::default(),
        warnings,
    )
}

#[allow(clippy::too_many_arguments)]
fn build_option(
    block: &PresenceBlock,
    commute_start: DateTime<Utc>,
    office_arrival: DateTime<Utc>,
    office_departure: DateTime<Utc>,
    commute_end: DateTime<Utc>,
    commute_details: CommuteDetails,
    warnings: Vec<String>,
) -> CommuteOption {
    let office_minutes = (office_departure - office_arrival).num_minutes();
    let total_commute_minutes = (office_arrival - commute_start).num_minutes()
        + (commute_end - office_departure).num_minutes();
    let total_day_minutes = (commute_end - commute_start).num_minutes();

    CommuteOption {
        kind: block.kind,
        commute_start: Some(commute_start),
        office_arrival: Some(office_arrival),
        office_departure: Some(office_departure),
        commute_end: Some(commute_end),
        office_duration: format_duration_minutes(office_minutes),
        office_meetings: block.office_meetings.clone(),
        remote_meetings: block.remote_meetings.clone(),
        compliance: block.compliance.clone(),
        commute_details,
        efficiency: EfficiencyMetrics {
            total_commute_minutes,
            office_minutes,
            total_day_minutes,
            commute_to_office_ratio: if office_minutes > 0 {
                total_commute_minutes as f64 / office_minutes as f64
            } else {
                0.0
            },
            day_efficiency: if total_day_minutes > 0 {
                office_minutes as f64 / total_day_minutes as f64
            } else {
                1.0
            },
        },
        warnings,
        compliance_score: block.compliance_score,
    }
}

/// Fixed-shape option for the remote candidate: no commute, full efficiency.
fn remote_option(block: &PresenceBlock) -> CommuteOption {
    CommuteOption {
        kind: block.kind,
        commute_start: None,
        office_arrival: None,
        office_departure: None,
        commute_end: None,
        office_duration: "0 hours (remote work)".to_string(),
        office_meetings: block.office_meetings.clone(),
        remote_meetings: block.remote_meetings.clone(),
        compliance: block.compliance.clone(),
        commute_details: CommuteDetails::default(),
        efficiency: EfficiencyMetrics {
            total_commute_minutes: 0,
            office_minutes: 0,
            total_day_minutes: REMOTE_DAY_MINUTES,
            commute_to_office_ratio: 0.0,
            day_efficiency: 1.0,
        },
        warnings: block.warnings.clone(),
        compliance_score: block.compliance_score,
    }
}

/// Resolve a decimal hour on the target date in the user's zone to a UTC
/// instant. DST gaps shift forward an hour; ambiguous times take the
/// earlier occurrence.
fn zoned_instant(date: NaiveDate, hour: f64, tz: Tz) -> Result<DateTime<Utc>, PlanError> {
    let total_minutes = (hour * 60.0).round() as i64;
    if !(0..48 * 60).contains(&total_minutes) {
        return Err(PlanError::Input(format!("Hour {} out of range", hour)));
    }
    let date = date + Duration::days(total_minutes / (24 * 60));
    let minutes = total_minutes % (24 * 60);
    let time = NaiveTime::from_hms_opt((minutes / 60) as u32, (minutes % 60) as u32, 0)
        .unwrap_or_default();
    let naive = date.and_time(time);

    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        chrono::LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| {
                    PlanError::Input(format!("Unresolvable local time {} in {}", naive, tz))
                })
        }
    }
}

fn utc_at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    date.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default())
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::travel::ScenarioTravel;
    use crate::types::{BlockKind, Confidence, MeetingClassification, MeetingType};
    use async_trait::async_trait;
    use chrono::Timelike;

    struct FailingTravel;

    #[async_trait]
    impl TravelEstimator for FailingTravel {
        async fn route_duration(
            &self,
            _user_id: &str,
            _origin: &str,
            _destination: &str,
            _timing: TravelTiming,
        ) -> Result<crate::travel::TravelEstimate, PlanError> {
            Err(PlanError::Collaborator("estimator offline".into()))
        }

        async fn optimal_departure(
            &self,
            _user_id: &str,
            _origin: &str,
            _destination: &str,
            _target_arrival: DateTime<Utc>,
        ) -> Result<crate::travel::DepartureEstimate, PlanError> {
            Err(PlanError::Collaborator("estimator offline".into()))
        }
    }

    fn request(tz: Tz) -> PlanningRequest {
        PlanningRequest {
            job_id: "job-1".to_string(),
            user_id: "user-1".to_string(),
            target_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            user_timezone: tz,
        }
    }

    fn office_block(arrival: f64, departure: f64) -> PresenceBlock {
        PresenceBlock {
            kind: BlockKind::FullDayOffice,
            window: PresenceWindow::Office(OfficeWindow::new(arrival, departure)),
            office_meetings: vec![MeetingClassification {
                meeting_id: "m1".into(),
                summary: "Client meeting".into(),
                start_time: utc_at(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(), 10, 0),
                end_time: utc_at(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(), 12, 0),
                start_hour: 10.0,
                end_hour: 12.0,
                requires_office: true,
                confidence: Confidence::High,
                reason: String::new(),
                meeting_type: MeetingType::ClientMeeting,
                attendee_count: 8,
                duration_minutes: 120,
            }],
            remote_meetings: Vec::new(),
            compliance: Default::default(),
            compliance_score: 90,
            is_valid: true,
            force_include: true,
            warnings: Vec::new(),
            uncovered_critical_meetings: Vec::new(),
        }
    }

    fn remote_block() -> PresenceBlock {
        PresenceBlock {
            kind: BlockKind::FullRemote,
            window: PresenceWindow::Remote,
            office_meetings: Vec::new(),
            remote_meetings: Vec::new(),
            compliance: Default::default(),
            compliance_score: 85,
            is_valid: true,
            force_include: true,
            warnings: Vec::new(),
            uncovered_critical_meetings: Vec::new(),
        }
    }

    fn no_cancel() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test]
    async fn test_office_option_timestamp_ordering() {
        let travel = ScenarioTravel::new(chrono_tz::UTC);
        let blocks = vec![office_block(9.0, 17.0)];
        let options = optimize_commute(&blocks, &request(chrono_tz::UTC), &travel, &no_cancel())
            .await
            .unwrap();
        assert_eq!(options.len(), 1);
        let option = &options[0];
        let start = option.commute_start.unwrap();
        let arrival = option.office_arrival.unwrap();
        let departure = option.office_departure.unwrap();
        let end = option.commute_end.unwrap();
        assert!(start < arrival);
        assert!(arrival < departure);
        assert!(departure < end);
        assert!(option.efficiency.day_efficiency > 0.0);
        assert!(option.efficiency.day_efficiency <= 1.0);
        assert_eq!(option.efficiency.office_minutes, 480);
        assert_eq!(option.office_duration, "8 hours");
        assert!(option.commute_details.morning.is_some());
        assert!(option.commute_details.evening.is_some());
    }

    #[tokio::test]
    async fn test_arrival_resolved_in_user_timezone() {
        let travel = ScenarioTravel::new(chrono_tz::UTC);
        let blocks = vec![office_block(9.0, 17.0)];
        let options = optimize_commute(
            &blocks,
            &request(chrono_tz::America::New_York),
            &travel,
            &no_cancel(),
        )
        .await
        .unwrap();
        // 9 AM EDT on 2025-03-14 is 13:00 UTC
        assert_eq!(options[0].office_arrival.unwrap().hour(), 13);
    }

    #[tokio::test]
    async fn test_remote_option_fixed_shape() {
        let travel = ScenarioTravel::new(chrono_tz::UTC);
        let blocks = vec![remote_block()];
        let options = optimize_commute(&blocks, &request(chrono_tz::UTC), &travel, &no_cancel())
            .await
            .unwrap();
        let option = &options[0];
        assert!(option.commute_start.is_none());
        assert!(option.office_arrival.is_none());
        assert!(option.office_departure.is_none());
        assert!(option.commute_end.is_none());
        assert_eq!(option.efficiency.day_efficiency, 1.0);
        assert_eq!(option.efficiency.total_commute_minutes, 0);
        assert_eq!(option.efficiency.total_day_minutes, 480);
    }

    #[tokio::test]
    async fn test_estimator_failure_degrades_to_fallback() {
        let blocks = vec![office_block(8.0, 18.0)];
        let options = optimize_commute(&blocks, &request(chrono_tz::UTC), &FailingTravel, &no_cancel())
            .await
            .unwrap();
        let option = &options[0];
        // Canonical 9-17 day with assumed 45-minute legs
        assert_eq!(option.office_arrival.unwrap().hour(), 9);
        assert_eq!(option.office_departure.unwrap().hour(), 17);
        assert_eq!(option.efficiency.total_commute_minutes, 90);
        assert!(option
            .warnings
            .iter()
            .any(|w| w.contains("Commute optimization degraded")));
        // Still a well-ordered day
        assert!(option.commute_start.unwrap() < option.office_arrival.unwrap());
        assert!(option.office_departure.unwrap() < option.commute_end.unwrap());
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_stage() {
        let travel = ScenarioTravel::new(chrono_tz::UTC);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let blocks = vec![office_block(9.0, 17.0)];
        let result = optimize_commute(&blocks, &request(chrono_tz::UTC), &travel, &rx).await;
        assert!(matches!(result, Err(PlanError::Cancelled)));
    }

    #[test]
    fn test_zoned_instant_handles_dst_gap() {
        // US DST spring-forward: 2025-03-09 02:30 does not exist in New York
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let resolved = zoned_instant(date, 2.5, chrono_tz::America::New_York).unwrap();
        // Shifted forward one hour: 03:30 EDT == 07:30 UTC
        assert_eq!(resolved.hour(), 7);
        assert_eq!(resolved.minute(), 30);
    }

    #[test]
    fn test_zoned_instant_rejects_out_of_range() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert!(zoned_instant(date, -1.0, chrono_tz::UTC).is_err());
        assert!(zoned_instant(date, 72.0, chrono_tz::UTC).is_err());
        // Past-midnight departures spill into the next day
        let next_day = zoned_instant(date, 25.0, chrono_tz::UTC).unwrap();
        assert_eq!(next_day.date_naive(), date + Duration::days(1));
        assert_eq!(next_day.hour(), 1);
    }
}

//! Travel-time estimation.
//!
//! The pipeline consumes travel times as opaque numbers from a
//! `TravelEstimator`. The built-in `ScenarioTravel` implementation is fully
//! deterministic: each user hashes to a fixed commute scenario, durations
//! vary by rush-hour/weekend multipliers plus a hash-derived jitter, and the
//! same query always returns the same answer.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::PlanError;
use crate::types::Confidence;
use crate::util::stable_hash;

/// Fixed buffer subtracted on top of travel time when computing the optimal
/// departure (parking, walking in).
pub const DEPARTURE_BUFFER_MINUTES: i64 = 5;

/// When a travel query should happen.
#[derive(Debug, Clone, Copy)]
pub enum TravelTiming {
    DepartAt(DateTime<Utc>),
    ArriveBy(DateTime<Utc>),
}

impl TravelTiming {
    fn instant(&self) -> DateTime<Utc> {
        match self {
            Self::DepartAt(t) | Self::ArriveBy(t) => *t,
        }
    }
}

/// One route estimate.
#[derive(Debug, Clone)]
pub struct TravelEstimate {
    pub duration_secs: i64,
    pub duration_text: String,
    pub route_label: String,
    pub traffic_label: String,
    pub delay_minutes: i64,
}

/// Result of an optimal-departure query.
#[derive(Debug, Clone)]
pub struct DepartureEstimate {
    pub optimal_departure: DateTime<Utc>,
    pub travel: TravelEstimate,
    pub buffer_minutes: i64,
    pub confidence: Confidence,
}

#[async_trait]
pub trait TravelEstimator: Send + Sync {
    /// Estimated travel time for a route at the given timing.
    async fn route_duration(
        &self,
        user_id: &str,
        origin: &str,
        destination: &str,
        timing: TravelTiming,
    ) -> Result<TravelEstimate, PlanError>;

    /// When to leave `origin` to reach `destination` by `target_arrival`,
    /// including the fixed departure buffer.
    async fn optimal_departure(
        &self,
        user_id: &str,
        origin: &str,
        destination: &str,
        target_arrival: DateTime<Utc>,
    ) -> Result<DepartureEstimate, PlanError>;
}

/// Base commute minutes and traffic multipliers per scenario.
struct Scenario {
    label: &'static str,
    base_minutes: f64,
    rush_multiplier: f64,
    off_peak_multiplier: f64,
    weekend_multiplier: f64,
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        label: "Via Brooklyn → Midtown",
        base_minutes: 45.0,
        rush_multiplier: 1.8,
        off_peak_multiplier: 0.7,
        weekend_multiplier: 0.6,
    },
    Scenario {
        label: "Via Queens → Midtown",
        base_minutes: 35.0,
        rush_multiplier: 1.6,
        off_peak_multiplier: 0.8,
        weekend_multiplier: 0.7,
    },
    Scenario {
        label: "Via New Jersey → Midtown",
        base_minutes: 60.0,
        rush_multiplier: 2.0,
        off_peak_multiplier: 0.8,
        weekend_multiplier: 0.6,
    },
    Scenario {
        label: "Via Westchester → Midtown",
        base_minutes: 55.0,
        rush_multiplier: 1.7,
        off_peak_multiplier: 0.9,
        weekend_multiplier: 0.7,
    },
];

/// Rush hour windows (inclusive, local hours).
const MORNING_RUSH: (u32, u32) = (7, 10);
const EVENING_RUSH: (u32, u32) = (17, 19);

/// Deterministic estimator keyed by user id.
pub struct ScenarioTravel {
    /// Zone used to decide rush hour from a UTC instant.
    zone: Tz,
}

impl ScenarioTravel {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    fn scenario_for(user_id: &str) -> &'static Scenario {
        let idx = (stable_hash(user_id) % SCENARIOS.len() as u64) as usize;
        &SCENARIOS[idx]
    }

    fn estimate(&self, user_id: &str, timing: TravelTiming) -> TravelEstimate {
        let scenario = Self::scenario_for(user_id);
        let local = timing.instant().with_timezone(&self.zone);
        let hour = local.hour();
        let is_weekend = matches!(
            local.weekday(),
            chrono::Weekday::Sat | chrono::Weekday::Sun
        );

        let (multiplier, traffic_label) = if is_weekend {
            (scenario.weekend_multiplier, "Light weekend traffic")
        } else if (MORNING_RUSH.0..=MORNING_RUSH.1).contains(&hour) {
            (scenario.rush_multiplier, "Heavy morning rush hour traffic")
        } else if (EVENING_RUSH.0..=EVENING_RUSH.1).contains(&hour) {
            (scenario.rush_multiplier, "Heavy evening rush hour traffic")
        } else {
            (scenario.off_peak_multiplier, "Light off-peak traffic")
        };

        // Deterministic ±10% jitter in place of the usual traffic noise
        let jitter_key = format!("{}_{}", user_id, timing.instant().timestamp());
        let jitter = 0.9 + (stable_hash(&jitter_key) % 2001) as f64 / 10_000.0;

        let minutes = (scenario.base_minutes * multiplier * jitter).round() as i64;
        TravelEstimate {
            duration_secs: minutes * 60,
            duration_text: format!("{} mins", minutes),
            route_label: scenario.label.to_string(),
            traffic_label: traffic_label.to_string(),
            delay_minutes: (minutes as f64 - scenario.base_minutes).max(0.0) as i64,
        }
    }
}

#[async_trait]
impl TravelEstimator for ScenarioTravel {
    async fn route_duration(
        &self,
        user_id: &str,
        _origin: &str,
        _destination: &str,
        timing: TravelTiming,
    ) -> Result<TravelEstimate, PlanError> {
        Ok(self.estimate(user_id, timing))
    }

    async fn optimal_departure(
        &self,
        user_id: &str,
        origin: &str,
        destination: &str,
        target_arrival: DateTime<Utc>,
    ) -> Result<DepartureEstimate, PlanError> {
        let travel = self
            .route_duration(
                user_id,
                origin,
                destination,
                TravelTiming::ArriveBy(target_arrival),
            )
            .await?;

        let lead = chrono::Duration::seconds(travel.duration_secs)
            + chrono::Duration::minutes(DEPARTURE_BUFFER_MINUTES);
        let confidence = if travel.delay_minutes < 10 {
            Confidence::High
        } else {
            Confidence::Medium
        };

        Ok(DepartureEstimate {
            optimal_departure: target_arrival - lead,
            travel,
            buffer_minutes: DEPARTURE_BUFFER_MINUTES,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn estimator() -> ScenarioTravel {
        ScenarioTravel::new(chrono_tz::UTC)
    }

    #[tokio::test]
    async fn test_estimates_are_deterministic() {
        let est = estimator();
        let when = TravelTiming::DepartAt(Utc.with_ymd_and_hms(2025, 3, 11, 8, 0, 0).unwrap());
        let a = est.route_duration("user-1", "home", "office", when).await.unwrap();
        let b = est.route_duration("user-1", "home", "office", when).await.unwrap();
        assert_eq!(a.duration_secs, b.duration_secs);
        assert_eq!(a.route_label, b.route_label);
    }

    #[tokio::test]
    async fn test_rush_hour_slower_than_off_peak() {
        let est = estimator();
        // Tuesday 8 AM vs Tuesday 1 PM. The rush multiplier is at least 1.6x,
        // jitter is at most ±10%, so rush must dominate.
        let rush = est
            .route_duration(
                "user-1",
                "home",
                "office",
                TravelTiming::DepartAt(Utc.with_ymd_and_hms(2025, 3, 11, 8, 0, 0).unwrap()),
            )
            .await
            .unwrap();
        let off_peak = est
            .route_duration(
                "user-1",
                "home",
                "office",
                TravelTiming::DepartAt(Utc.with_ymd_and_hms(2025, 3, 11, 13, 0, 0).unwrap()),
            )
            .await
            .unwrap();
        assert!(rush.duration_secs > off_peak.duration_secs);
        assert!(rush.traffic_label.contains("rush hour"));
    }

    #[tokio::test]
    async fn test_weekend_traffic_label() {
        let est = estimator();
        // 2025-03-15 is a Saturday
        let estimate = est
            .route_duration(
                "user-1",
                "home",
                "office",
                TravelTiming::DepartAt(Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(estimate.traffic_label, "Light weekend traffic");
    }

    #[tokio::test]
    async fn test_optimal_departure_includes_buffer() {
        let est = estimator();
        let arrival = Utc.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap();
        let departure = est
            .optimal_departure("user-1", "home", "office", arrival)
            .await
            .unwrap();
        let lead_secs = (arrival - departure.optimal_departure).num_seconds();
        assert_eq!(
            lead_secs,
            departure.travel.duration_secs + DEPARTURE_BUFFER_MINUTES * 60
        );
        assert!(departure.optimal_departure < arrival);
    }
}

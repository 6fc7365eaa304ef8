//! Option ranking and presentation: the final pipeline stage.
//!
//! Scores every commute option (compliance base plus efficiency, coverage,
//! and flexibility adjustments), stable-sorts descending, and renders one
//! immutable `Recommendation` per rank with formatted compliance verdicts,
//! perception analysis, templated reasoning, and trade-offs. Output is never
//! re-scored after formatting.

use std::collections::BTreeMap;

use crate::types::{
    BlockKind, CommuteOption, Confidence, PerceptionAnalysis, ProfessionalImpact, Recommendation,
    TeamVisibility, TradeOffs,
};

const EFFICIENCY_BONUS_HIGH: i32 = 20;
const EFFICIENCY_BONUS_MEDIUM: i32 = 10;
const REMOTE_FLEXIBILITY_BONUS: i32 = 15;
const FULL_COVERAGE_BONUS: i32 = 15;
const WARNING_PENALTY: i32 = 5;
const HIGH_COMMUTE_RATIO_PENALTY: i32 = 10;
const HIGH_COMMUTE_RATIO: f64 = 0.5;

/// Rank all options and render recommendations. Deterministic: equal scores
/// keep their candidate-generation order.
pub fn present_recommendations(options: &[CommuteOption]) -> Vec<Recommendation> {
    let mut scored: Vec<(i32, &CommuteOption)> =
        options.iter().map(|o| (total_score(o), o)).collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .iter()
        .enumerate()
        .map(|(index, (_, option))| format_recommendation(option, index as u32 + 1))
        .collect()
}

/// Multi-factor score: compliance base, efficiency bonuses, flexibility and
/// coverage bonuses, warning and commute-ratio penalties. Clamped at zero.
pub fn total_score(option: &CommuteOption) -> i32 {
    let mut score = option.compliance_score;

    if option.efficiency.day_efficiency > 0.8 {
        score += EFFICIENCY_BONUS_HIGH;
    } else if option.efficiency.day_efficiency > 0.6 {
        score += EFFICIENCY_BONUS_MEDIUM;
    }

    if option.kind == BlockKind::FullRemote && option.warnings.is_empty() {
        score += REMOTE_FLEXIBILITY_BONUS;
    }

    let all_high_confidence = !option.office_meetings.is_empty()
        && option
            .office_meetings
            .iter()
            .all(|m| m.confidence == Confidence::High);
    if all_high_confidence {
        score += FULL_COVERAGE_BONUS;
    }

    score -= option.warnings.len() as i32 * WARNING_PENALTY;

    if option.efficiency.commute_to_office_ratio > HIGH_COMMUTE_RATIO {
        score -= HIGH_COMMUTE_RATIO_PENALTY;
    }

    score.max(0)
}

fn format_recommendation(option: &CommuteOption, rank: u32) -> Recommendation {
    let business_rule_compliance: BTreeMap<String, String> = option
        .compliance
        .iter()
        .map(|(rule, check)| {
            (
                rule.clone(),
                format!("{} ({})", check.status.as_str(), check.message),
            )
        })
        .collect();

    Recommendation {
        option_rank: rank,
        kind: option.kind,
        commute_start: option.commute_start,
        office_arrival: option.office_arrival,
        office_departure: option.office_departure,
        commute_end: option.commute_end,
        office_duration: option.office_duration.clone(),
        office_meetings: option
            .office_meetings
            .iter()
            .map(|m| m.meeting_id.clone())
            .collect(),
        remote_meetings: option
            .remote_meetings
            .iter()
            .map(|m| m.meeting_id.clone())
            .collect(),
        business_rule_compliance,
        perception_analysis: analyze_perception(option),
        reasoning: build_reasoning(option, rank),
        trade_offs: analyze_trade_offs(option),
    }
}

/// Professional-perception judgment from option type and score thresholds.
fn analyze_perception(option: &CommuteOption) -> PerceptionAnalysis {
    let (impact, base_reasoning, visibility) = if option.kind == BlockKind::FullRemote {
        if option.warnings.is_empty() {
            (
                ProfessionalImpact::NeutralToPositive,
                "Efficient remote work with no critical office meetings missed",
                TeamVisibility::Medium,
            )
        } else {
            (
                ProfessionalImpact::Neutral,
                "Remote work with some trade-offs in meeting attendance",
                TeamVisibility::Low,
            )
        }
    } else if option.compliance_score >= 80 {
        (
            ProfessionalImpact::VeryPositive,
            "Strong office presence demonstrating commitment and professionalism",
            TeamVisibility::High,
        )
    } else if option.compliance_score >= 60 {
        (
            ProfessionalImpact::NeutralToPositive,
            "Good balance of office presence and meeting requirements",
            TeamVisibility::Medium,
        )
    } else {
        (
            ProfessionalImpact::Neutral,
            "Office presence meets basic requirements but may have perception risks",
            TeamVisibility::Low,
        )
    };

    let reasoning = match option.kind {
        BlockKind::FullDayOffice => {
            "Extended office presence maximizes face-time and collaboration opportunities"
        }
        BlockKind::StrategicAfternoon => {
            "Strategic afternoon presence for key meetings while maintaining flexibility"
        }
        BlockKind::StrategicMorning => {
            "Early arrival demonstrates dedication and ensures availability for morning priorities"
        }
        BlockKind::CoreHoursPresence => {
            "Core hours presence ensures availability during peak collaboration time"
        }
        BlockKind::PolicyRequired | BlockKind::FullRemote => base_reasoning,
    };

    PerceptionAnalysis {
        professional_impact: impact,
        reasoning: reasoning.to_string(),
        team_visibility: visibility,
    }
}

/// Free-text reasoning assembled from templates keyed by option type,
/// efficiency, and rank.
fn build_reasoning(option: &CommuteOption, rank: u32) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(match rank {
        1 => "Recommended option:".to_string(),
        2 => "Strong alternative:".to_string(),
        n => format!("Option #{}:", n),
    });

    let office_count = option.office_meetings.len();
    let remote_count = option.remote_meetings.len();
    match option.kind {
        BlockKind::FullRemote => parts.push(format!(
            "Full remote work maximizes flexibility and productivity. All {} meetings can be \
             handled effectively remotely. Zero commute time provides more room for deep work \
             and better work-life balance.",
            remote_count
        )),
        BlockKind::FullDayOffice => parts.push(format!(
            "Full day office presence provides maximum visibility and collaboration \
             opportunities. Covers all {} office-required meetings with strong professional \
             presence. Office duration of {} demonstrates commitment and availability.",
            office_count, option.office_duration
        )),
        BlockKind::StrategicAfternoon => parts.push(format!(
            "Strategic afternoon presence optimally balances meeting requirements with \
             flexibility. Covers {} key office meetings while allowing remote work for {} \
             other commitments. Efficient use of office time.",
            office_count, remote_count
        )),
        _ => parts.push(format!(
            "This option covers {} office meetings while maintaining flexibility for {} \
             remote interactions.",
            office_count, remote_count
        )),
    }

    let efficiency = &option.efficiency;
    if efficiency.day_efficiency > 0.8 {
        parts.push("Excellent time efficiency with minimal commute overhead.".to_string());
    } else if efficiency.commute_to_office_ratio > 0.4 {
        parts.push(format!(
            "Moderate efficiency with {}% of office time spent commuting.",
            (efficiency.commute_to_office_ratio * 100.0).round() as i64
        ));
    }

    if let Some(first) = option.warnings.first() {
        parts.push(format!(
            "Note: {} considerations including {}.",
            option.warnings.len(),
            first.to_lowercase()
        ));
    }

    parts.join(" ")
}

fn analyze_trade_offs(option: &CommuteOption) -> TradeOffs {
    let efficiency_score = Some(format!("{:.1}%", option.efficiency.day_efficiency * 100.0));

    if option.kind == BlockKind::FullRemote {
        return TradeOffs {
            pros: vec![
                "Zero commute time and costs".to_string(),
                "Maximum flexibility and comfort".to_string(),
                "Optimal work-life balance".to_string(),
                "Environmental benefits (no travel)".to_string(),
            ],
            cons: vec![
                "Limited face-to-face interaction".to_string(),
                "Potential visibility concerns with management".to_string(),
                "May miss spontaneous collaboration opportunities".to_string(),
            ],
            cost_impact: "Saves ~$40-60/day in commute costs".to_string(),
            time_investment: None,
            efficiency_score,
        };
    }

    let commute_minutes = option.efficiency.total_commute_minutes;
    let office_minutes = option.efficiency.office_minutes;
    let mut pros = vec![
        format!(
            "Direct engagement in {} key meetings",
            option.office_meetings.len()
        ),
        "High visibility and professional presence".to_string(),
        "Spontaneous collaboration opportunities".to_string(),
        "Access to office resources and environment".to_string(),
    ];
    let mut cons = vec![
        format!("{} minutes total commute time", commute_minutes),
        "Commute costs (parking, gas, time value)".to_string(),
        "Less flexibility for personal schedule".to_string(),
    ];

    match option.kind {
        BlockKind::FullDayOffice => {
            pros.push("Maximum in-person collaboration time".to_string());
            cons.push("Longest day with commute overhead".to_string());
        }
        BlockKind::StrategicMorning | BlockKind::StrategicAfternoon => {
            pros.push("Optimal balance of presence and flexibility".to_string());
            cons.push("Split attention between office and remote work".to_string());
        }
        _ => {}
    }

    TradeOffs {
        pros,
        cons,
        cost_impact: "~$40-60/day in commute expenses".to_string(),
        time_investment: Some(format!(
            "{} min commute for {} min office time",
            commute_minutes, office_minutes
        )),
        efficiency_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CommuteDetails, EfficiencyMetrics, MeetingClassification, MeetingType, RuleCheck,
    };
    use chrono::{TimeZone, Utc};

    fn meeting(id: &str, confidence: Confidence) -> MeetingClassification {
        MeetingClassification {
            meeting_id: id.to_string(),
            summary: format!("Meeting {}", id),
            start_time: Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 3, 14, 11, 0, 0).unwrap(),
            start_hour: 10.0,
            end_hour: 11.0,
            requires_office: true,
            confidence,
            reason: String::new(),
            meeting_type: MeetingType::ClientMeeting,
            attendee_count: 5,
            duration_minutes: 60,
        }
    }

    fn office_option(score: i32, day_efficiency: f64) -> CommuteOption {
        CommuteOption {
            kind: BlockKind::FullDayOffice,
            commute_start: Some(Utc.with_ymd_and_hms(2025, 3, 14, 7, 0, 0).unwrap()),
            office_arrival: Some(Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap()),
            office_departure: Some(Utc.with_ymd_and_hms(2025, 3, 14, 18, 0, 0).unwrap()),
            commute_end: Some(Utc.with_ymd_and_hms(2025, 3, 14, 19, 0, 0).unwrap()),
            office_duration: "10 hours".to_string(),
            office_meetings: vec![meeting("m1", Confidence::High)],
            remote_meetings: Vec::new(),
            compliance: [("minimum_stay".to_string(), RuleCheck::pass("fine"))]
                .into_iter()
                .collect(),
            commute_details: CommuteDetails::default(),
            efficiency: EfficiencyMetrics {
                total_commute_minutes: 120,
                office_minutes: 600,
                total_day_minutes: 720,
                commute_to_office_ratio: 0.2,
                day_efficiency,
            },
            warnings: Vec::new(),
            compliance_score: score,
        }
    }

    fn remote_option(score: i32, warnings: Vec<String>) -> CommuteOption {
        CommuteOption {
            kind: BlockKind::FullRemote,
            commute_start: None,
            office_arrival: None,
            office_departure: None,
            commute_end: None,
            office_duration: "0 hours (remote work)".to_string(),
            office_meetings: Vec::new(),
            remote_meetings: vec![meeting("m1", Confidence::High)],
            compliance: Default::default(),
            commute_details: CommuteDetails::default(),
            efficiency: EfficiencyMetrics {
                total_commute_minutes: 0,
                office_minutes: 0,
                total_day_minutes: 480,
                commute_to_office_ratio: 0.0,
                day_efficiency: 1.0,
            },
            warnings,
            compliance_score: score,
        }
    }

    #[test]
    fn test_score_composition() {
        // 90 base + 20 efficiency + 15 full high-confidence coverage = 125
        assert_eq!(total_score(&office_option(90, 0.85)), 125);
        // Medium efficiency tier
        assert_eq!(total_score(&office_option(90, 0.7)), 115);
        // No efficiency bonus at 0.6 or below
        assert_eq!(total_score(&office_option(90, 0.6)), 105);
    }

    #[test]
    fn test_remote_flexibility_bonus_requires_clean_warnings() {
        // 85 + 20 efficiency + 15 flexibility = 120
        assert_eq!(total_score(&remote_option(85, vec![])), 120);
        // Warning: no flexibility bonus, -5 penalty => 85 + 20 - 5 = 100
        assert_eq!(
            total_score(&remote_option(85, vec!["missed a meeting".to_string()])),
            100
        );
    }

    #[test]
    fn test_warning_and_ratio_penalties() {
        let mut option = office_option(80, 0.85);
        option.warnings = vec!["w1".to_string(), "w2".to_string()];
        option.efficiency.commute_to_office_ratio = 0.6;
        // 80 + 20 + 15 - 10 - 10 = 95
        assert_eq!(total_score(&option), 95);
    }

    #[test]
    fn test_score_clamped_at_zero() {
        let mut option = office_option(0, 0.3);
        option.office_meetings = vec![meeting("m1", Confidence::Low)];
        option.warnings = (0..10).map(|i| format!("w{}", i)).collect();
        assert_eq!(total_score(&option), 0);
    }

    #[test]
    fn test_ranking_is_deterministic_and_contiguous() {
        let options = vec![
            office_option(70, 0.85),
            remote_option(85, vec![]),
            office_option(70, 0.85),
        ];
        let first = present_recommendations(&options);
        let second = present_recommendations(&options);

        let ranks: Vec<u32> = first.iter().map(|r| r.option_rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        let kinds_first: Vec<BlockKind> = first.iter().map(|r| r.kind).collect();
        let kinds_second: Vec<BlockKind> = second.iter().map(|r| r.kind).collect();
        assert_eq!(kinds_first, kinds_second);
        // Remote (120) outranks both identical office options (105 each),
        // which keep generation order
        assert_eq!(first[0].kind, BlockKind::FullRemote);
    }

    #[test]
    fn test_compliance_formatting() {
        let recommendations = present_recommendations(&[office_option(90, 0.85)]);
        let compliance = &recommendations[0].business_rule_compliance;
        assert_eq!(compliance["minimum_stay"], "PASS (fine)");
    }

    #[test]
    fn test_perception_thresholds() {
        let rec = &present_recommendations(&[office_option(85, 0.85)])[0];
        assert_eq!(
            rec.perception_analysis.professional_impact,
            ProfessionalImpact::VeryPositive
        );
        assert_eq!(rec.perception_analysis.team_visibility, TeamVisibility::High);

        let rec = &present_recommendations(&[office_option(65, 0.85)])[0];
        assert_eq!(
            rec.perception_analysis.professional_impact,
            ProfessionalImpact::NeutralToPositive
        );

        let rec = &present_recommendations(&[office_option(40, 0.85)])[0];
        assert_eq!(
            rec.perception_analysis.professional_impact,
            ProfessionalImpact::Neutral
        );
    }

    #[test]
    fn test_remote_perception_keyed_on_warnings() {
        let clean = &present_recommendations(&[remote_option(85, vec![])])[0];
        assert_eq!(
            clean.perception_analysis.professional_impact,
            ProfessionalImpact::NeutralToPositive
        );

        let warned =
            &present_recommendations(&[remote_option(0, vec!["missed".to_string()])])[0];
        assert_eq!(
            warned.perception_analysis.professional_impact,
            ProfessionalImpact::Neutral
        );
        assert_eq!(warned.perception_analysis.team_visibility, TeamVisibility::Low);
    }

    #[test]
    fn test_reasoning_rank_prefixes() {
        let options = vec![office_option(90, 0.85), remote_option(40, vec![])];
        let recommendations = present_recommendations(&options);
        assert!(recommendations[0].reasoning.starts_with("Recommended option:"));
        assert!(recommendations[1].reasoning.starts_with("Strong alternative:"));
    }

    #[test]
    fn test_trade_offs_shapes() {
        let office = &present_recommendations(&[office_option(90, 0.85)])[0];
        assert!(office.trade_offs.time_investment.is_some());
        assert!(office
            .trade_offs
            .cons
            .iter()
            .any(|c| c.contains("120 minutes total commute time")));
        assert_eq!(office.trade_offs.efficiency_score.as_deref(), Some("85.0%"));

        let remote = &present_recommendations(&[remote_option(85, vec![])])[0];
        assert!(remote.trade_offs.time_investment.is_none());
        assert!(remote.trade_offs.pros.iter().any(|p| p.contains("Zero commute")));
        assert_eq!(remote.trade_offs.efficiency_score.as_deref(), Some("100.0%"));
    }

    #[test]
    fn test_meeting_ids_carried_into_recommendation() {
        let rec = &present_recommendations(&[office_option(90, 0.85)])[0];
        assert_eq!(rec.office_meetings, vec!["m1".to_string()]);
        assert!(rec.remote_meetings.is_empty());
    }
}

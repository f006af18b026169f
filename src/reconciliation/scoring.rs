//! Feature scoring for a single movement / history entry pair

use bigdecimal::{BigDecimal, Zero};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::reconciliation::options::Tolerances;
use crate::types::*;

/// Point weights and bands used when scoring a pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringPolicy {
    pub exact_amount_points: u32,
    pub close_amount_points: u32,
    pub near_amount_points: u32,
    /// Upper bound, in percent, of the "close" amount band
    pub close_amount_percent: u32,
    /// Upper bound, in percent, of the "near" amount band
    pub near_amount_percent: u32,
    pub exact_time_points: u32,
    pub fuzzy_time_points: u32,
    pub range_time_points: u32,
    pub vehicle_points: u32,
    pub beneficiary_points: u32,
    pub created_same_day_points: u32,
    pub created_same_week_points: u32,
    /// Subtracted when the amount is the only feature that matched
    pub single_signal_penalty: u32,
    /// Number of candidates kept for manual review
    pub max_candidates: usize,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            exact_amount_points: 40,
            close_amount_points: 30,
            near_amount_points: 15,
            close_amount_percent: 5,
            near_amount_percent: 15,
            exact_time_points: 30,
            fuzzy_time_points: 20,
            range_time_points: 10,
            vehicle_points: 15,
            beneficiary_points: 15,
            created_same_day_points: 5,
            created_same_week_points: 2,
            single_signal_penalty: 10,
            max_candidates: 5,
        }
    }
}

pub const NO_MATCH_REASON: &str = "no match";

/// Points and explanation produced by one feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureScore {
    pub points: u32,
    pub reason: String,
}

impl FeatureScore {
    fn hit(points: u32, reason: impl Into<String>) -> Option<Self> {
        Some(Self {
            points,
            reason: reason.into(),
        })
    }
}

/// Combined confidence for one pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    /// 0 to 100
    pub confidence: u8,
    pub primary_reason: String,
    pub reasons: Vec<String>,
}

pub fn score_amount(
    movement_amount: &BigDecimal,
    history_amount: Option<&BigDecimal>,
    policy: &ScoringPolicy,
) -> Option<FeatureScore> {
    let history_amount = history_amount?;
    if history_amount == movement_amount {
        return FeatureScore::hit(policy.exact_amount_points, "Exact amount match");
    }

    let base = movement_amount.abs();
    if base.is_zero() {
        return None;
    }
    let percent = (history_amount - movement_amount).abs() * BigDecimal::from(100) / base;

    if percent <= BigDecimal::from(policy.close_amount_percent) {
        FeatureScore::hit(
            policy.close_amount_points,
            format!("Amount within {}% ({}%)", policy.close_amount_percent, percent.round(2)),
        )
    } else if percent <= BigDecimal::from(policy.near_amount_percent) {
        FeatureScore::hit(
            policy.near_amount_points,
            format!("Amount within {}% ({}%)", policy.near_amount_percent, percent.round(2)),
        )
    } else {
        None
    }
}

pub fn score_date(
    movement_date: NaiveDateTime,
    history_date: Option<NaiveDateTime>,
    tolerances: &Tolerances,
    policy: &ScoringPolicy,
) -> Option<FeatureScore> {
    let diff = (history_date? - movement_date).abs();

    if diff <= tolerances.exact() {
        FeatureScore::hit(
            policy.exact_time_points,
            format!("Time match ({} min apart)", diff.num_minutes()),
        )
    } else if diff <= tolerances.fuzzy() {
        FeatureScore::hit(
            policy.fuzzy_time_points,
            format!("Close time ({} min apart)", diff.num_minutes()),
        )
    } else if diff <= tolerances.max() {
        FeatureScore::hit(
            policy.range_time_points,
            format!("Within {} days ({} h apart)", tolerances.max_time_days, diff.num_hours()),
        )
    } else {
        None
    }
}

fn normalized(reference: Option<&String>) -> Option<&str> {
    reference.map(|r| r.trim()).filter(|r| !r.is_empty())
}

pub fn score_reference(
    movement_ref: Option<&String>,
    history_ref: Option<&String>,
    points: u32,
    reason: &str,
) -> Option<FeatureScore> {
    match (normalized(movement_ref), normalized(history_ref)) {
        (Some(left), Some(right)) if left == right => FeatureScore::hit(points, reason),
        _ => None,
    }
}

pub fn score_creation_proximity(
    movement_created: NaiveDateTime,
    history_created: NaiveDateTime,
    policy: &ScoringPolicy,
) -> Option<FeatureScore> {
    let diff = (history_created - movement_created).abs();

    if diff <= Duration::days(1) {
        FeatureScore::hit(policy.created_same_day_points, "Created within 1 day")
    } else if diff <= Duration::days(7) {
        FeatureScore::hit(policy.created_same_week_points, "Created within 7 days")
    } else {
        None
    }
}

/// Score a movement against one history entry.
///
/// Features are evaluated in a fixed order (amount, date, vehicle,
/// beneficiary, creation proximity) and their reasons keep that order. When
/// the amount is the only matching feature the single-signal penalty applies.
pub fn score_match(
    movement: &Movement,
    history: &ContractHistoryEntry,
    tolerances: &Tolerances,
    policy: &ScoringPolicy,
) -> MatchScore {
    let empty = EventMetadata::default();
    let metadata = history.event_metadata.as_ref().unwrap_or(&empty);

    let amount = score_amount(&movement.amount, metadata.amount.as_ref(), policy);
    let amount_matched = amount.is_some();

    let features = [
        amount,
        score_date(movement.date, metadata.date, tolerances, policy),
        score_reference(
            movement.vehicle_id.as_ref(),
            metadata.vehicle_id.as_ref(),
            policy.vehicle_points,
            "Same vehicle",
        ),
        score_reference(
            movement.beneficiary_id.as_ref(),
            metadata.beneficiary_id.as_ref(),
            policy.beneficiary_points,
            "Same beneficiary",
        ),
        score_creation_proximity(movement.created_at, history.created_at, policy),
    ];

    let mut total: i64 = 0;
    let mut reasons = Vec::new();
    for feature in features.into_iter().flatten() {
        total += i64::from(feature.points);
        reasons.push(feature.reason);
    }

    if amount_matched && reasons.len() == 1 {
        total -= i64::from(policy.single_signal_penalty);
    }

    let confidence = total.clamp(0, 100) as u8;
    let primary_reason = reasons
        .first()
        .cloned()
        .unwrap_or_else(|| NO_MATCH_REASON.to_string());

    MatchScore {
        confidence,
        primary_reason,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn movement(amount: i64, date: NaiveDateTime) -> Movement {
        Movement::new("m1".to_string(), BigDecimal::from(amount), date, Direction::In)
            .with_created_at(at(1, 0, 0))
    }

    fn history(metadata: EventMetadata, created_at: NaiveDateTime) -> ContractHistoryEntry {
        ContractHistoryEntry::new("h1".to_string(), "EXTENSION".to_string(), String::new())
            .with_metadata(metadata)
            .with_created_at(created_at)
    }

    #[test]
    fn test_amount_bands() {
        let policy = ScoringPolicy::default();
        let base = BigDecimal::from(500);

        let exact = score_amount(&base, Some(&BigDecimal::from(500)), &policy).unwrap();
        assert_eq!(exact.points, 40);

        let close = score_amount(&base, Some(&BigDecimal::from(525)), &policy).unwrap();
        assert_eq!(close.points, 30);

        let near = score_amount(&base, Some(&BigDecimal::from(550)), &policy).unwrap();
        assert_eq!(near.points, 15);

        assert!(score_amount(&base, Some(&BigDecimal::from(600)), &policy).is_none());
        assert!(score_amount(&base, None, &policy).is_none());
        assert!(score_amount(&BigDecimal::from(0), Some(&base), &policy).is_none());
    }

    #[test]
    fn test_amount_band_edges_are_inclusive() {
        let policy = ScoringPolicy::default();
        let base = BigDecimal::from(500);
        let points = |other: &str| {
            score_amount(&base, Some(&other.parse::<BigDecimal>().unwrap()), &policy)
                .map(|f| f.points)
        };

        assert_eq!(points("525"), Some(30));
        assert_eq!(points("525.01"), Some(15));
        assert_eq!(points("575"), Some(15));
        assert_eq!(points("425"), Some(15));
        assert_eq!(points("575.01"), None);
    }

    #[test]
    fn test_creation_proximity_bands() {
        let policy = ScoringPolicy::default();
        let created = at(1, 0, 0);
        let points =
            |other| score_creation_proximity(created, other, &policy).map(|f| f.points);

        assert_eq!(points(at(2, 0, 0)), Some(5));
        assert_eq!(points(at(2, 0, 1)), Some(2));
        assert_eq!(points(at(8, 0, 0)), Some(2));
        assert_eq!(points(at(8, 0, 1)), None);
    }

    #[test]
    fn test_date_bands_are_inclusive() {
        let policy = ScoringPolicy::default();
        let tolerances = Tolerances::default();
        let base = at(10, 10, 0);

        let points = |other| score_date(base, Some(other), &tolerances, &policy).map(|f| f.points);
        assert_eq!(points(at(10, 10, 5)), Some(30));
        assert_eq!(points(at(10, 10, 6)), Some(20));
        assert_eq!(points(at(10, 12, 0)), Some(20));
        assert_eq!(points(at(10, 13, 0)), Some(10));
        assert_eq!(points(at(17, 10, 0)), Some(10));
        assert_eq!(points(at(17, 10, 1)), None);
        assert_eq!(points(at(10, 9, 57)), Some(30));
    }

    #[test]
    fn test_references_are_trimmed() {
        let left = " V1 ".to_string();
        let right = "V1".to_string();
        let blank = "  ".to_string();
        assert!(score_reference(Some(&left), Some(&right), 15, "Same vehicle").is_some());
        assert!(score_reference(Some(&blank), Some(&blank), 15, "Same vehicle").is_none());
        assert!(score_reference(None, Some(&right), 15, "Same vehicle").is_none());
    }

    #[test]
    fn test_exact_match_scores_full_confidence() {
        let movement = movement(500, at(10, 10, 0))
            .with_vehicle("V1")
            .with_beneficiary("B1");
        let entry = history(
            EventMetadata {
                amount: Some(BigDecimal::from(500)),
                date: Some(at(10, 10, 2)),
                vehicle_id: Some("V1".to_string()),
                beneficiary_id: Some("B1".to_string()),
            },
            at(20, 0, 0),
        );

        let score = score_match(&movement, &entry, &Tolerances::default(), &ScoringPolicy::default());
        assert_eq!(score.confidence, 100);
        assert_eq!(score.primary_reason, "Exact amount match");
        assert_eq!(score.reasons.len(), 4);
    }

    #[test]
    fn test_weak_match() {
        let movement = movement(500, at(10, 10, 0));
        let entry = history(
            EventMetadata {
                amount: Some(BigDecimal::from(550)),
                date: Some(at(10, 13, 0)),
                ..Default::default()
            },
            at(20, 0, 0),
        );

        let score = score_match(&movement, &entry, &Tolerances::default(), &ScoringPolicy::default());
        assert_eq!(score.confidence, 25);
        assert_eq!(score.reasons.len(), 2);
    }

    #[test]
    fn test_amount_only_is_penalized() {
        let movement = movement(500, at(10, 10, 0)).with_vehicle("V1");
        let entry = history(
            EventMetadata {
                amount: Some(BigDecimal::from(500)),
                vehicle_id: Some("V2".to_string()),
                ..Default::default()
            },
            at(20, 0, 0),
        );

        let score = score_match(&movement, &entry, &Tolerances::default(), &ScoringPolicy::default());
        assert_eq!(score.confidence, 30);
        assert_eq!(score.reasons, vec!["Exact amount match".to_string()]);
    }

    #[test]
    fn test_creation_proximity_lifts_the_penalty() {
        let movement = movement(500, at(10, 10, 0));
        let entry = history(
            EventMetadata {
                amount: Some(BigDecimal::from(500)),
                ..Default::default()
            },
            at(1, 12, 0),
        );

        let score = score_match(&movement, &entry, &Tolerances::default(), &ScoringPolicy::default());
        assert_eq!(score.confidence, 45);
        assert_eq!(score.reasons[1], "Created within 1 day");
    }

    #[test]
    fn test_no_match() {
        let movement = movement(500, at(10, 10, 0));
        let entry = history(
            EventMetadata {
                amount: Some(BigDecimal::from(9000)),
                ..Default::default()
            },
            at(30, 0, 0),
        );

        let score = score_match(&movement, &entry, &Tolerances::default(), &ScoringPolicy::default());
        assert_eq!(score.confidence, 0);
        assert_eq!(score.primary_reason, NO_MATCH_REASON);
        assert!(score.reasons.is_empty());
    }

    #[test]
    fn test_confidence_stays_in_bounds() {
        let tolerances = Tolerances::default();
        let policy = ScoringPolicy::default();
        let amounts = [1, 95, 100, 110, 500, 10_000];
        let hours = [0, 1, 3, 48, 400];
        let refs = [None, Some("V1"), Some("V2")];

        for &m_amount in &amounts {
            for &h_amount in &amounts {
                for &offset in &hours {
                    for vehicle in refs {
                        let mut movement = movement(m_amount, at(10, 0, 0));
                        movement.vehicle_id = vehicle.map(str::to_string);
                        movement.beneficiary_id = Some("B1".to_string());
                        let entry = history(
                            EventMetadata {
                                amount: Some(BigDecimal::from(h_amount)),
                                date: Some(at(10, 0, 0) + Duration::hours(offset)),
                                vehicle_id: Some("V1".to_string()),
                                beneficiary_id: Some("B1".to_string()),
                            },
                            at(1, 1, 0),
                        );
                        let score = score_match(&movement, &entry, &tolerances, &policy);
                        assert!(score.confidence <= 100);
                    }
                }
            }
        }
    }
}

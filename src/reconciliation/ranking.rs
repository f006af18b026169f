//! Candidate ranking and match classification

use serde::{Deserialize, Serialize};

use crate::reconciliation::options::{Thresholds, Tolerances};
use crate::reconciliation::scoring::{score_match, ScoringPolicy};
use crate::types::*;

/// A scored candidate history entry for one movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub history_entry: ContractHistoryEntry,
    pub confidence: u8,
    pub primary_reason: String,
    pub reasons: Vec<String>,
}

/// Ranked candidates for one movement, best first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub best_match: Option<MatchResult>,
    /// Top candidates, bounded by the policy's `max_candidates`
    pub candidates: Vec<MatchResult>,
}

impl Ranking {
    pub fn best_confidence(&self) -> u8 {
        self.best_match.as_ref().map_or(0, |m| m.confidence)
    }
}

/// Score a movement against a pool of history entries.
///
/// Candidates with zero confidence are dropped. Equal confidences are
/// ordered by the entry's creation time, then by id.
pub fn rank_candidates<'a, I>(
    movement: &Movement,
    pool: I,
    tolerances: &Tolerances,
    policy: &ScoringPolicy,
) -> Ranking
where
    I: IntoIterator<Item = &'a ContractHistoryEntry>,
{
    let mut scored: Vec<MatchResult> = pool
        .into_iter()
        .filter_map(|entry| {
            let score = score_match(movement, entry, tolerances, policy);
            (score.confidence > 0).then(|| MatchResult {
                history_entry: entry.clone(),
                confidence: score.confidence,
                primary_reason: score.primary_reason,
                reasons: score.reasons,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.history_entry.created_at.cmp(&b.history_entry.created_at))
            .then_with(|| a.history_entry.id.cmp(&b.history_entry.id))
    });
    let best_match = scored.first().cloned();
    scored.truncate(policy.max_candidates);

    Ranking {
        best_match,
        candidates: scored,
    }
}

/// How an auto-linked pair was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Failed,
}

/// Outcome of classifying a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Link without review; carries `Exact` or `Fuzzy`
    AutoLink(MatchType),
    ManualReview,
    Unmatched,
}

/// Confidence at and above which an auto-link is labelled exact
pub const EXACT_MATCH_CONFIDENCE: u8 = 90;

/// Apply the thresholds to a ranking
pub fn classify(ranking: &Ranking, thresholds: &Thresholds) -> Decision {
    let Some(best) = ranking.best_match.as_ref() else {
        return Decision::Unmatched;
    };

    if best.confidence >= thresholds.min_confidence_for_auto_link {
        let match_type = if best.confidence >= EXACT_MATCH_CONFIDENCE {
            MatchType::Exact
        } else {
            MatchType::Fuzzy
        };
        Decision::AutoLink(match_type)
    } else if best.confidence >= thresholds.min_confidence_for_manual_review {
        Decision::ManualReview
    } else {
        Decision::Unmatched
    }
}

//! Reconciliation report and the per-movement records it aggregates

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reconciliation::ranking::{MatchResult, MatchType, Ranking};
use crate::types::*;

pub const UNMATCHED_REASON: &str = "no confident match found";

/// Compact view of a movement for reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSummary {
    pub id: String,
    pub amount: BigDecimal,
    pub date: NaiveDateTime,
    pub movement_type: String,
    pub direction: Direction,
    pub vehicle_id: Option<String>,
    pub beneficiary_id: Option<String>,
    pub detail: String,
}

impl From<&Movement> for MovementSummary {
    fn from(movement: &Movement) -> Self {
        Self {
            id: movement.id.clone(),
            amount: movement.amount.clone(),
            date: movement.date,
            movement_type: movement.movement_type.clone(),
            direction: movement.direction,
            vehicle_id: movement.vehicle_id.clone(),
            beneficiary_id: movement.beneficiary_id.clone(),
            detail: movement.detail.clone(),
        }
    }
}

/// Compact view of a contract history entry for reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub id: String,
    pub action: String,
    pub details: String,
    pub amount: Option<BigDecimal>,
    pub date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl From<&ContractHistoryEntry> for HistorySummary {
    fn from(entry: &ContractHistoryEntry) -> Self {
        let metadata = entry.event_metadata.as_ref();
        Self {
            id: entry.id.clone(),
            action: entry.action.clone(),
            details: entry.details.clone(),
            amount: metadata.and_then(|m| m.amount.clone()),
            date: metadata.and_then(|m| m.date),
            created_at: entry.created_at,
        }
    }
}

/// Outcome for a movement that was auto-linked or left unmatched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub movement_id: String,
    pub history_id: Option<String>,
    pub match_type: MatchType,
    pub confidence: u8,
    pub reason: String,
    pub movement_summary: MovementSummary,
    pub history_summary: Option<HistorySummary>,
}

impl OutcomeRecord {
    pub fn linked(movement: &Movement, best: &MatchResult, match_type: MatchType) -> Self {
        Self {
            movement_id: movement.id.clone(),
            history_id: Some(best.history_entry.id.clone()),
            match_type,
            confidence: best.confidence,
            reason: best.reasons.join(", "),
            movement_summary: movement.into(),
            history_summary: Some((&best.history_entry).into()),
        }
    }

    pub fn unmatched(movement: &Movement, confidence: u8) -> Self {
        Self {
            movement_id: movement.id.clone(),
            history_id: None,
            match_type: MatchType::Failed,
            confidence,
            reason: UNMATCHED_REASON.to_string(),
            movement_summary: movement.into(),
            history_summary: None,
        }
    }
}

/// One candidate shown to an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PossibleMatch {
    pub history_id: String,
    pub history: HistorySummary,
    pub confidence: u8,
    pub reasons: Vec<String>,
}

/// A movement that needs a human decision, with its best candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCandidateRecord {
    pub movement_id: String,
    pub movement: MovementSummary,
    pub possible_matches: Vec<PossibleMatch>,
}

impl ManualCandidateRecord {
    pub fn new(movement: &Movement, ranking: &Ranking) -> Self {
        Self {
            movement_id: movement.id.clone(),
            movement: movement.into(),
            possible_matches: ranking
                .candidates
                .iter()
                .map(|candidate| PossibleMatch {
                    history_id: candidate.history_entry.id.clone(),
                    history: (&candidate.history_entry).into(),
                    confidence: candidate.confidence,
                    reasons: candidate.reasons.clone(),
                })
                .collect(),
        }
    }
}

/// What happened to one movement during a run
#[derive(Debug, Clone, PartialEq)]
pub enum MovementOutcome {
    Linked(OutcomeRecord),
    ManualReview(ManualCandidateRecord),
    Unmatched(OutcomeRecord),
}

/// Report for one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub total_movements: usize,
    pub total_history_entries: usize,
    pub linked_pairs: usize,
    pub manual_review_needed: usize,
    pub unmatched: usize,
    pub errors: Vec<String>,
    pub details: Vec<OutcomeRecord>,
    pub manual_candidates: Vec<ManualCandidateRecord>,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
}

impl ReconciliationResult {
    pub fn new(
        run_id: Uuid,
        dry_run: bool,
        total_movements: usize,
        total_history_entries: usize,
        started_at: NaiveDateTime,
    ) -> Self {
        Self {
            run_id,
            dry_run,
            total_movements,
            total_history_entries,
            linked_pairs: 0,
            manual_review_needed: 0,
            unmatched: 0,
            errors: Vec::new(),
            details: Vec::new(),
            manual_candidates: Vec::new(),
            started_at,
            finished_at: None,
        }
    }

    /// Add one movement outcome to the totals
    pub fn record(&mut self, outcome: MovementOutcome) {
        match outcome {
            MovementOutcome::Linked(record) => {
                self.linked_pairs += 1;
                self.details.push(record);
            }
            MovementOutcome::ManualReview(candidate) => {
                self.manual_review_needed += 1;
                self.manual_candidates.push(candidate);
            }
            MovementOutcome::Unmatched(record) => {
                self.unmatched += 1;
                self.details.push(record);
            }
        }
    }

    pub fn record_error(&mut self, movement_id: &str, error: &ReconError) {
        self.errors
            .push(format!("Error processing movement {movement_id}: {error}"));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(chrono::Utc::now().naive_utc());
    }

    /// Detail record for a movement, if it was linked or unmatched
    pub fn detail_for(&self, movement_id: &str) -> Option<&OutcomeRecord> {
        self.details.iter().find(|d| d.movement_id == movement_id)
    }
}

//! Batch reconciliation over all unlinked movements

use std::collections::HashSet;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::reconciliation::linker::Linker;
use crate::reconciliation::options::{ReconciliationOptions, ReconciliationOptionsInput};
use crate::reconciliation::ranking::{classify, rank_candidates, Decision, Ranking};
use crate::reconciliation::report::*;
use crate::reconciliation::scoring::ScoringPolicy;
use crate::traits::*;
use crate::types::*;

/// Reconciliation engine linking cash movements to contract history entries
pub struct ReconciliationEngine<M: MovementStore, H: ContractHistoryStore> {
    pub(super) movements: M,
    pub(super) history: H,
    policy: ScoringPolicy,
    validator: Box<dyn MovementValidator>,
}

impl<M: MovementStore, H: ContractHistoryStore> ReconciliationEngine<M, H> {
    /// Create a new engine over the given stores
    pub fn new(movements: M, history: H) -> Self {
        Self::with_validator(movements, history, Box::new(DefaultMovementValidator))
    }

    /// Create a new engine with a custom movement validator
    pub fn with_validator(
        movements: M,
        history: H,
        validator: Box<dyn MovementValidator>,
    ) -> Self {
        Self {
            movements,
            history,
            policy: ScoringPolicy::default(),
            validator,
        }
    }

    /// Replace the scoring policy
    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Run a reconciliation pass with caller-supplied options merged over the defaults
    pub async fn run_reconciliation(
        &mut self,
        input: &ReconciliationOptionsInput,
    ) -> ReconResult<ReconciliationResult> {
        let options = input.resolve()?;
        self.run(&options).await
    }

    /// Run a reconciliation pass with fully resolved options.
    ///
    /// Both candidate pools are loaded once. A failure while loading them
    /// aborts the run; a failure on a single movement is recorded in
    /// `errors` and the run moves on.
    pub async fn run(
        &mut self,
        options: &ReconciliationOptions,
    ) -> ReconResult<ReconciliationResult> {
        options.validate()?;
        let run_id = Uuid::new_v4();
        let span = info_span!("reconciliation_run", %run_id, dry_run = options.dry_run);
        self.run_pass(run_id, options).instrument(span).await
    }

    async fn run_pass(
        &mut self,
        run_id: Uuid,
        options: &ReconciliationOptions,
    ) -> ReconResult<ReconciliationResult> {
        let started_at = chrono::Utc::now().naive_utc();
        let movements = self.movements.find_unlinked().await?;
        let pool: Vec<ContractHistoryEntry> = self
            .history
            .find_eligible()
            .await?
            .into_iter()
            .filter(ContractHistoryEntry::is_eligible)
            .collect();

        info!(
            movements = movements.len(),
            history_entries = pool.len(),
            "candidate pools loaded"
        );

        let mut result = ReconciliationResult::new(
            run_id,
            options.dry_run,
            movements.len(),
            pool.len(),
            started_at,
        );

        // History entries taken by an earlier movement of this run
        let mut claimed: HashSet<String> = HashSet::new();

        for movement in movements.iter().filter(|m| !m.is_linked()) {
            match self.reconcile_movement(movement, &pool, &claimed, options).await {
                Ok(outcome) => {
                    if let MovementOutcome::Linked(record) = &outcome {
                        claimed.extend(record.history_id.iter().cloned());
                    }
                    result.record(outcome);
                }
                Err(err) => {
                    warn!(movement_id = %movement.id, error = %err, "movement skipped");
                    result.record_error(&movement.id, &err);
                }
            }
        }

        result.finish();
        info!(
            linked = result.linked_pairs,
            manual_review = result.manual_review_needed,
            unmatched = result.unmatched,
            errors = result.errors.len(),
            "reconciliation finished"
        );
        Ok(result)
    }

    async fn reconcile_movement(
        &mut self,
        movement: &Movement,
        pool: &[ContractHistoryEntry],
        claimed: &HashSet<String>,
        options: &ReconciliationOptions,
    ) -> ReconResult<MovementOutcome> {
        self.validator.validate_movement(movement)?;

        let available = pool.iter().filter(|entry| !claimed.contains(&entry.id));
        let ranking = rank_candidates(movement, available, &options.tolerances, &self.policy);
        let decision = classify(&ranking, &options.thresholds);

        match (decision, ranking.best_match.as_ref()) {
            (Decision::AutoLink(match_type), Some(best)) => {
                Linker::new(&mut self.movements, &mut self.history)
                    .link(&movement.id, &best.history_entry.id, options.dry_run)
                    .await?;
                info!(
                    movement_id = %movement.id,
                    history_id = %best.history_entry.id,
                    confidence = best.confidence,
                    ?match_type,
                    "movement auto-linked"
                );
                Ok(MovementOutcome::Linked(OutcomeRecord::linked(
                    movement, best, match_type,
                )))
            }
            (Decision::ManualReview, _) => {
                debug!(
                    movement_id = %movement.id,
                    candidates = ranking.candidates.len(),
                    "movement needs manual review"
                );
                Ok(MovementOutcome::ManualReview(ManualCandidateRecord::new(
                    movement, &ranking,
                )))
            }
            _ => {
                debug!(
                    movement_id = %movement.id,
                    best_confidence = ranking.best_confidence(),
                    "no confident match"
                );
                Ok(MovementOutcome::Unmatched(OutcomeRecord::unmatched(
                    movement,
                    ranking.best_confidence(),
                )))
            }
        }
    }

    /// Ranked candidates for one unlinked movement, without linking anything
    pub async fn suggest_matches(
        &self,
        movement_id: &str,
        input: &ReconciliationOptionsInput,
    ) -> ReconResult<Ranking> {
        let options = input.resolve()?;
        let movement = self
            .movements
            .find_by_id(movement_id)
            .await?
            .ok_or_else(|| ReconError::MovementNotFound(movement_id.to_string()))?;

        if let Some(history_id) = &movement.linked_history_id {
            return Err(ReconError::MovementAlreadyLinked {
                movement_id: movement.id.clone(),
                history_id: history_id.clone(),
            });
        }

        let pool = self.history.find_eligible().await?;
        Ok(rank_candidates(
            &movement,
            pool.iter().filter(|entry| entry.is_eligible()),
            &options.tolerances,
            &self.policy,
        ))
    }
}

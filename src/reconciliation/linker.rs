//! Bidirectional linking of a movement and a history entry

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::traits::*;
use crate::types::*;

/// What the linker did for a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkOutcome {
    /// Both sides were written
    Linked,
    /// Dry run: the pair passed the re-check but nothing was written
    Simulated,
}

/// Single write path for links between movements and history entries.
///
/// Every link re-reads both records immediately before writing and refuses
/// when either side already holds a reference, so a pool snapshot taken
/// earlier cannot cause a double link.
pub struct Linker<'s, M: MovementStore, H: ContractHistoryStore> {
    movements: &'s mut M,
    history: &'s mut H,
}

impl<'s, M: MovementStore, H: ContractHistoryStore> Linker<'s, M, H> {
    pub fn new(movements: &'s mut M, history: &'s mut H) -> Self {
        Self { movements, history }
    }

    /// Check that both records exist and are free to link
    pub async fn ensure_linkable(
        &self,
        movement_id: &str,
        history_id: &str,
    ) -> ReconResult<(Movement, ContractHistoryEntry)> {
        let movement = self
            .movements
            .find_by_id(movement_id)
            .await?
            .ok_or_else(|| ReconError::MovementNotFound(movement_id.to_string()))?;

        let entry = self
            .history
            .find_by_id(history_id)
            .await?
            .filter(|entry| !entry.is_deleted)
            .ok_or_else(|| ReconError::HistoryNotFound(history_id.to_string()))?;

        if let Some(linked) = &movement.linked_history_id {
            return Err(ReconError::MovementAlreadyLinked {
                movement_id: movement.id.clone(),
                history_id: linked.clone(),
            });
        }

        if let Some(linked) = &entry.linked_movement_id {
            return Err(ReconError::HistoryAlreadyLinked {
                history_id: entry.id.clone(),
                movement_id: linked.clone(),
            });
        }

        Ok((movement, entry))
    }

    /// Link a movement and a history entry in both directions
    pub async fn link(
        &mut self,
        movement_id: &str,
        history_id: &str,
        dry_run: bool,
    ) -> ReconResult<LinkOutcome> {
        self.ensure_linkable(movement_id, history_id).await?;

        if dry_run {
            debug!(movement_id, history_id, "dry run, link not written");
            return Ok(LinkOutcome::Simulated);
        }

        self.movements
            .update(movement_id, LinkPatch::Set(history_id.to_string()))
            .await?;

        if let Err(err) = self
            .history
            .update(history_id, LinkPatch::Set(movement_id.to_string()))
            .await
        {
            warn!(
                movement_id,
                history_id,
                error = %err,
                "history side of link failed, reverting movement"
            );
            if let Err(clear_err) = self.movements.update(movement_id, LinkPatch::Clear).await {
                error!(
                    movement_id,
                    history_id,
                    link_error = %err,
                    revert_error = %clear_err,
                    "revert failed, movement left pointing at history entry"
                );
                return Err(ReconError::Storage(format!(
                    "half-link may remain: movement {movement_id} -> {history_id}; \
                     link error: {err}; revert error: {clear_err}"
                )));
            }
            return Err(err);
        }

        debug!(movement_id, history_id, "link written");
        Ok(LinkOutcome::Linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn seeded() -> MemoryStorage {
        let at = NaiveDate::from_ymd_opt(2024, 4, 2)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap();
        let storage = MemoryStorage::new();
        for id in ["m1", "m2"] {
            storage
                .insert_movement(Movement::new(
                    id.to_string(),
                    BigDecimal::from(120),
                    at,
                    Direction::In,
                ))
                .unwrap();
        }
        storage
            .insert_history(ContractHistoryEntry::new(
                "h1".to_string(),
                "EXTENSION".to_string(),
                "One extra day".to_string(),
            ))
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_link_writes_both_sides() {
        let storage = seeded();
        let (mut movements, mut history) = (storage.clone(), storage.clone());
        let outcome = Linker::new(&mut movements, &mut history)
            .link("m1", "h1", false)
            .await
            .unwrap();

        assert_eq!(outcome, LinkOutcome::Linked);
        assert_eq!(
            storage.movement("m1").unwrap().linked_history_id.as_deref(),
            Some("h1")
        );
        assert_eq!(
            storage.history_entry("h1").unwrap().linked_movement_id.as_deref(),
            Some("m1")
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let storage = seeded();
        let (mut movements, mut history) = (storage.clone(), storage.clone());
        let outcome = Linker::new(&mut movements, &mut history)
            .link("m1", "h1", true)
            .await
            .unwrap();

        assert_eq!(outcome, LinkOutcome::Simulated);
        assert!(!storage.movement("m1").unwrap().is_linked());
        assert!(!storage.history_entry("h1").unwrap().is_linked());
    }

    #[tokio::test]
    async fn test_second_claim_on_history_entry_is_refused() {
        let storage = seeded();
        let (mut movements, mut history) = (storage.clone(), storage.clone());
        let mut linker = Linker::new(&mut movements, &mut history);
        linker.link("m1", "h1", false).await.unwrap();

        let second = linker.link("m2", "h1", false).await;
        assert!(matches!(
            second,
            Err(ReconError::HistoryAlreadyLinked { ref movement_id, .. }) if movement_id == "m1"
        ));
        assert!(!storage.movement("m2").unwrap().is_linked());
    }

    #[tokio::test]
    async fn test_soft_deleted_entry_counts_as_missing() {
        let storage = seeded();
        let mut entry = storage.history_entry("h1").unwrap();
        entry.is_deleted = true;
        storage.insert_history(entry).unwrap();

        let (mut movements, mut history) = (storage.clone(), storage.clone());
        let result = Linker::new(&mut movements, &mut history)
            .link("m1", "h1", false)
            .await;
        assert!(matches!(result, Err(ReconError::HistoryNotFound(_))));
    }

    /// History store whose writes always fail
    struct FailingHistory(MemoryStorage);

    #[async_trait::async_trait]
    impl ContractHistoryStore for FailingHistory {
        async fn find_eligible(&self) -> ReconResult<Vec<ContractHistoryEntry>> {
            self.0.find_eligible().await
        }

        async fn find_by_id(&self, history_id: &str) -> ReconResult<Option<ContractHistoryEntry>> {
            ContractHistoryStore::find_by_id(&self.0, history_id).await
        }

        async fn update(&mut self, _history_id: &str, _patch: LinkPatch) -> ReconResult<()> {
            Err(ReconError::Storage("history store is read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_history_write_reverts_movement() {
        let storage = seeded();
        let mut movements = storage.clone();
        let mut history = FailingHistory(storage.clone());

        let result = Linker::new(&mut movements, &mut history)
            .link("m1", "h1", false)
            .await;
        assert!(matches!(result, Err(ReconError::Storage(_))));
        assert!(!storage.movement("m1").unwrap().is_linked());
    }

    /// Movement store that accepts links but cannot clear them
    struct StickyMovements(MemoryStorage);

    #[async_trait::async_trait]
    impl MovementStore for StickyMovements {
        async fn find_unlinked(&self) -> ReconResult<Vec<Movement>> {
            self.0.find_unlinked().await
        }

        async fn find_by_id(&self, movement_id: &str) -> ReconResult<Option<Movement>> {
            MovementStore::find_by_id(&self.0, movement_id).await
        }

        async fn update(&mut self, movement_id: &str, patch: LinkPatch) -> ReconResult<()> {
            match patch {
                LinkPatch::Clear => Err(ReconError::Storage("connection reset".to_string())),
                set => MovementStore::update(&mut self.0, movement_id, set).await,
            }
        }
    }

    #[tokio::test]
    async fn test_failed_revert_reports_half_link() {
        let storage = seeded();
        let mut movements = StickyMovements(storage.clone());
        let mut history = FailingHistory(storage.clone());

        let result = Linker::new(&mut movements, &mut history)
            .link("m1", "h1", false)
            .await;
        match result {
            Err(ReconError::Storage(message)) => {
                assert!(message.contains("half-link may remain"));
                assert!(message.contains("m1 -> h1"));
                assert!(message.contains("history store is read-only"));
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected a storage error, got {other:?}"),
        }
        assert_eq!(
            storage.movement("m1").unwrap().linked_history_id.as_deref(),
            Some("h1")
        );
    }
}

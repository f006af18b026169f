//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying maps, so one clone can be handed to the
/// engine as the movement store and another as the history store.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    movements: Arc<RwLock<HashMap<String, Movement>>>,
    history: Arc<RwLock<HashMap<String, ContractHistoryEntry>>>,
}

fn read<T>(lock: &RwLock<T>) -> ReconResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| ReconError::Storage("memory storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> ReconResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| ReconError::Storage("memory storage lock poisoned".to_string()))
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            movements: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace a movement
    pub fn insert_movement(&self, movement: Movement) -> ReconResult<()> {
        write(&self.movements)?.insert(movement.id.clone(), movement);
        Ok(())
    }

    /// Insert or replace a history entry
    pub fn insert_history(&self, entry: ContractHistoryEntry) -> ReconResult<()> {
        write(&self.history)?.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Snapshot of a movement
    pub fn movement(&self, movement_id: &str) -> Option<Movement> {
        read(&self.movements).ok()?.get(movement_id).cloned()
    }

    /// Snapshot of a history entry
    pub fn history_entry(&self, history_id: &str) -> Option<ContractHistoryEntry> {
        read(&self.history).ok()?.get(history_id).cloned()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> ReconResult<()> {
        write(&self.movements)?.clear();
        write(&self.history)?.clear();
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MovementStore for MemoryStorage {
    async fn find_unlinked(&self) -> ReconResult<Vec<Movement>> {
        let movements = read(&self.movements)?;
        let mut unlinked: Vec<Movement> = movements
            .values()
            .filter(|movement| !movement.is_linked())
            .cloned()
            .collect();
        unlinked.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(unlinked)
    }

    async fn find_by_id(&self, movement_id: &str) -> ReconResult<Option<Movement>> {
        Ok(read(&self.movements)?.get(movement_id).cloned())
    }

    async fn update(&mut self, movement_id: &str, patch: LinkPatch) -> ReconResult<()> {
        let mut movements = write(&self.movements)?;
        let movement = movements
            .get_mut(movement_id)
            .ok_or_else(|| ReconError::MovementNotFound(movement_id.to_string()))?;

        match patch {
            LinkPatch::Set(history_id) => {
                if let Some(existing) = &movement.linked_history_id {
                    return Err(ReconError::MovementAlreadyLinked {
                        movement_id: movement_id.to_string(),
                        history_id: existing.clone(),
                    });
                }
                movement.linked_history_id = Some(history_id);
            }
            LinkPatch::Clear => movement.linked_history_id = None,
        }
        Ok(())
    }
}

#[async_trait]
impl ContractHistoryStore for MemoryStorage {
    async fn find_eligible(&self) -> ReconResult<Vec<ContractHistoryEntry>> {
        let history = read(&self.history)?;
        let mut eligible: Vec<ContractHistoryEntry> = history
            .values()
            .filter(|entry| entry.is_eligible())
            .cloned()
            .collect();
        eligible.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(eligible)
    }

    async fn find_by_id(&self, history_id: &str) -> ReconResult<Option<ContractHistoryEntry>> {
        Ok(read(&self.history)?.get(history_id).cloned())
    }

    async fn update(&mut self, history_id: &str, patch: LinkPatch) -> ReconResult<()> {
        let mut history = write(&self.history)?;
        let entry = history
            .get_mut(history_id)
            .ok_or_else(|| ReconError::HistoryNotFound(history_id.to_string()))?;

        match patch {
            LinkPatch::Set(movement_id) => {
                if let Some(existing) = &entry.linked_movement_id {
                    return Err(ReconError::HistoryAlreadyLinked {
                        history_id: history_id.to_string(),
                        movement_id: existing.clone(),
                    });
                }
                entry.linked_movement_id = Some(movement_id);
            }
            LinkPatch::Clear => entry.linked_movement_id = None,
        }
        Ok(())
    }
}

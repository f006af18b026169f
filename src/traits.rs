//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Change applied to the counterpart reference of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkPatch {
    /// Point the record at its counterpart. Stores must refuse this when the
    /// record already holds a reference.
    Set(String),
    /// Drop the reference. Only used to undo a half-written link.
    Clear,
}

/// Storage abstraction for cash movements
///
/// The reconciliation engine works with any storage backend by implementing
/// these methods. Listing methods must return records in ascending
/// `created_at` order.
#[async_trait]
pub trait MovementStore: Send + Sync {
    /// List movements that are not linked to any history entry
    async fn find_unlinked(&self) -> ReconResult<Vec<Movement>>;

    /// Get a movement by ID
    async fn find_by_id(&self, movement_id: &str) -> ReconResult<Option<Movement>>;

    /// Update the link field of a movement
    async fn update(&mut self, movement_id: &str, patch: LinkPatch) -> ReconResult<()>;
}

/// Storage abstraction for contract history entries
#[async_trait]
pub trait ContractHistoryStore: Send + Sync {
    /// List entries that are unlinked, not soft-deleted, and carry metadata
    async fn find_eligible(&self) -> ReconResult<Vec<ContractHistoryEntry>>;

    /// Get a history entry by ID, including soft-deleted ones
    async fn find_by_id(&self, history_id: &str) -> ReconResult<Option<ContractHistoryEntry>>;

    /// Update the link field of a history entry
    async fn update(&mut self, history_id: &str, patch: LinkPatch) -> ReconResult<()>;
}

/// Trait for implementing custom movement checks run before scoring
pub trait MovementValidator: Send + Sync {
    /// Validate a movement before it is scored against the history pool
    fn validate_movement(&self, movement: &Movement) -> ReconResult<()>;
}

/// Default movement validator; only rejects records without an id.
///
/// Amounts are not checked here: zero and negative amounts are still
/// reconcilable and score like any other value.
pub struct DefaultMovementValidator;

impl MovementValidator for DefaultMovementValidator {
    fn validate_movement(&self, movement: &Movement) -> ReconResult<()> {
        if movement.id.trim().is_empty() {
            return Err(ReconError::Validation(
                "Movement ID cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

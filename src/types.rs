//! Core types and data structures for the reconciliation system

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of money for a cash movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Money coming into the register
    In,
    /// Money leaving the register
    Out,
}

/// A cash-register ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    /// Unique identifier for the movement
    pub id: String,
    /// Amount of the movement; the direction of money lives in `direction`
    pub amount: BigDecimal,
    /// Business date and time of the transaction
    pub date: NaiveDateTime,
    /// Free-form movement type (rental, deposit, fuel, ...)
    pub movement_type: String,
    /// Whether money came in or went out
    pub direction: Direction,
    /// Vehicle the movement refers to
    pub vehicle_id: Option<String>,
    /// Person or company the movement refers to
    pub beneficiary_id: Option<String>,
    /// Free text entered by the operator
    pub detail: String,
    /// When the record was created
    pub created_at: NaiveDateTime,
    /// Counterpart contract history entry, once linked
    pub linked_history_id: Option<String>,
}

impl Movement {
    /// Create a new, unlinked movement
    pub fn new(id: String, amount: BigDecimal, date: NaiveDateTime, direction: Direction) -> Self {
        Self {
            id,
            amount,
            date,
            movement_type: String::new(),
            direction,
            vehicle_id: None,
            beneficiary_id: None,
            detail: String::new(),
            created_at: chrono::Utc::now().naive_utc(),
            linked_history_id: None,
        }
    }

    pub fn with_type(mut self, movement_type: impl Into<String>) -> Self {
        self.movement_type = movement_type.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_vehicle(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_id = Some(vehicle_id.into());
        self
    }

    pub fn with_beneficiary(mut self, beneficiary_id: impl Into<String>) -> Self {
        self.beneficiary_id = Some(beneficiary_id.into());
        self
    }

    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether this movement already points at a history entry
    pub fn is_linked(&self) -> bool {
        self.linked_history_id.is_some()
    }
}

/// Monetary details carried by a contract history entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    pub amount: Option<BigDecimal>,
    pub date: Option<NaiveDateTime>,
    pub vehicle_id: Option<String>,
    pub beneficiary_id: Option<String>,
}

impl EventMetadata {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.date.is_none()
            && self.vehicle_id.is_none()
            && self.beneficiary_id.is_none()
    }
}

/// An audit entry describing a contract or booking change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractHistoryEntry {
    /// Unique identifier for the entry
    pub id: String,
    /// What happened to the contract (EXTENSION, PAYMENT_NOTE, ...)
    pub action: String,
    /// Free-text description of the change
    pub details: String,
    /// Monetary metadata, when the change involved money
    pub event_metadata: Option<EventMetadata>,
    /// When the entry was created
    pub created_at: NaiveDateTime,
    /// Soft-delete flag
    pub is_deleted: bool,
    /// Counterpart movement, once linked
    pub linked_movement_id: Option<String>,
}

impl ContractHistoryEntry {
    /// Create a new, unlinked history entry without metadata
    pub fn new(id: String, action: String, details: String) -> Self {
        Self {
            id,
            action,
            details,
            event_metadata: None,
            created_at: chrono::Utc::now().naive_utc(),
            is_deleted: false,
            linked_movement_id: None,
        }
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.event_metadata = Some(metadata);
        self
    }

    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_linked(&self) -> bool {
        self.linked_movement_id.is_some()
    }

    /// Whether the entry may take part in a reconciliation candidate pool:
    /// not linked, not soft-deleted, and carrying non-empty metadata.
    pub fn is_eligible(&self) -> bool {
        !self.is_linked()
            && !self.is_deleted
            && self
                .event_metadata
                .as_ref()
                .is_some_and(|metadata| !metadata.is_empty())
    }
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Movement not found: {0}")]
    MovementNotFound(String),
    #[error("Contract history entry not found: {0}")]
    HistoryNotFound(String),
    #[error("Movement {movement_id} is already linked to history entry {history_id}")]
    MovementAlreadyLinked {
        movement_id: String,
        history_id: String,
    },
    #[error("History entry {history_id} is already linked to movement {movement_id}")]
    HistoryAlreadyLinked {
        history_id: String,
        movement_id: String,
    },
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;

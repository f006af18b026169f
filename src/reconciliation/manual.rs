//! Operator-forced links that bypass scoring

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::reconciliation::engine::ReconciliationEngine;
use crate::reconciliation::linker::Linker;
use crate::traits::*;
use crate::types::*;

/// Audit payload returned for a manual link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualLinkData {
    pub movement_id: String,
    pub history_id: String,
    pub reason: String,
    pub linked_at: NaiveDateTime,
}

/// Result of a manual link request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualLinkOutcome {
    pub success: bool,
    pub message: String,
    pub data: Option<ManualLinkData>,
}

impl ManualLinkOutcome {
    fn rejected(message: String) -> Self {
        Self {
            success: false,
            message,
            data: None,
        }
    }
}

impl<M: MovementStore, H: ContractHistoryStore> ReconciliationEngine<M, H> {
    /// Link a movement to a history entry chosen by an operator.
    ///
    /// Unknown ids and records that already hold a link are reported as an
    /// unsuccessful outcome; only storage failures come back as `Err`.
    pub async fn create_manual_link(
        &mut self,
        movement_id: &str,
        history_id: &str,
        reason: &str,
    ) -> ReconResult<ManualLinkOutcome> {
        let linked = Linker::new(&mut self.movements, &mut self.history)
            .link(movement_id, history_id, false)
            .await;

        match linked {
            Ok(_) => {
                let data = ManualLinkData {
                    movement_id: movement_id.to_string(),
                    history_id: history_id.to_string(),
                    reason: reason.trim().to_string(),
                    linked_at: chrono::Utc::now().naive_utc(),
                };
                info!(
                    movement_id,
                    history_id,
                    reason = %data.reason,
                    "manual link created"
                );
                Ok(ManualLinkOutcome {
                    success: true,
                    message: format!("Movement {movement_id} linked to history entry {history_id}"),
                    data: Some(data),
                })
            }
            Err(
                err @ (ReconError::MovementNotFound(_)
                | ReconError::HistoryNotFound(_)
                | ReconError::MovementAlreadyLinked { .. }
                | ReconError::HistoryAlreadyLinked { .. }),
            ) => {
                warn!(movement_id, history_id, error = %err, "manual link rejected");
                Ok(ManualLinkOutcome::rejected(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }
}

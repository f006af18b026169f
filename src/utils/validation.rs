//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> ReconResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(ReconError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a record ID is usable as a link reference
pub fn validate_record_id(record_id: &str) -> ReconResult<()> {
    if record_id.trim().is_empty() {
        return Err(ReconError::Validation(
            "Record ID cannot be empty".to_string(),
        ));
    }

    if record_id.len() > 64 {
        return Err(ReconError::Validation(
            "Record ID cannot exceed 64 characters".to_string(),
        ));
    }

    if !record_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ReconError::Validation(format!(
            "Record ID '{record_id}' can only contain alphanumeric characters, dashes, and underscores"
        )));
    }

    Ok(())
}

/// Validate an optional vehicle or beneficiary reference
pub fn validate_reference(label: &str, reference: Option<&String>) -> ReconResult<()> {
    match reference {
        Some(value) if value.trim().is_empty() => Err(ReconError::Validation(format!(
            "{label} reference is present but blank"
        ))),
        _ => Ok(()),
    }
}

/// Stricter movement validator for stores fed by manual data entry
pub struct EnhancedMovementValidator;

impl MovementValidator for EnhancedMovementValidator {
    fn validate_movement(&self, movement: &Movement) -> ReconResult<()> {
        validate_record_id(&movement.id)?;
        validate_positive_amount(&movement.amount)?;
        validate_reference("Vehicle", movement.vehicle_id.as_ref())?;
        validate_reference("Beneficiary", movement.beneficiary_id.as_ref())?;

        if movement.date > movement.created_at + chrono::Duration::days(366) {
            return Err(ReconError::Validation(format!(
                "Movement {} is dated more than a year after it was recorded",
                movement.id
            )));
        }

        Ok(())
    }
}

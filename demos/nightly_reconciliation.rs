//! Nightly reconciliation example
//!
//! Seeds an in-memory store with a day of rental movements and contract
//! history, previews the run, then applies it and resolves a review item by hand.
//!
//! Run with `RUST_LOG=movement_reconciliation=debug` to see per-movement decisions.

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use movement_reconciliation::{
    utils::MemoryStorage, ContractHistoryEntry, Direction, EventMetadata, Movement,
    ReconciliationEngine, ReconciliationOptionsInput,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let day = NaiveDate::from_ymd_opt(2024, 6, 14).ok_or("invalid date")?;
    let at = |hour, minute| day.and_hms_opt(hour, minute, 0).ok_or("invalid time");

    let storage = MemoryStorage::new();

    // Extension paid at the desk, logged on the contract two minutes later
    storage.insert_movement(
        Movement::new("mov-001".to_string(), BigDecimal::from(180), at(9, 15)?, Direction::In)
            .with_type("EXTENSION")
            .with_vehicle("VAN-12")
            .with_beneficiary("CUST-88")
            .with_created_at(at(9, 15)?),
    )?;
    storage.insert_history(
        ContractHistoryEntry::new(
            "hist-001".to_string(),
            "EXTENSION".to_string(),
            "Extended by two days".to_string(),
        )
        .with_metadata(EventMetadata {
            amount: Some(BigDecimal::from(180)),
            date: Some(at(9, 17)?),
            vehicle_id: Some("VAN-12".to_string()),
            beneficiary_id: Some("CUST-88".to_string()),
        })
        .with_created_at(at(9, 17)?),
    )?;

    // Fuel surcharge noted on the contract with a slightly different amount
    storage.insert_movement(
        Movement::new("mov-002".to_string(), BigDecimal::from(64), at(14, 0)?, Direction::In)
            .with_type("FUEL")
            .with_created_at(at(14, 0)? + Duration::days(3)),
    )?;
    storage.insert_history(
        ContractHistoryEntry::new(
            "hist-002".to_string(),
            "PAYMENT_NOTE".to_string(),
            "Fuel surcharge".to_string(),
        )
        .with_metadata(EventMetadata {
            amount: Some(BigDecimal::from(62)),
            date: Some(at(15, 10)?),
            ..Default::default()
        })
        .with_created_at(at(15, 10)?),
    )?;

    let mut engine = ReconciliationEngine::new(storage.clone(), storage.clone());

    let preview = engine
        .run_reconciliation(&ReconciliationOptionsInput::dry_run())
        .await?;
    println!(
        "Preview: {} linked, {} for review, {} unmatched",
        preview.linked_pairs, preview.manual_review_needed, preview.unmatched
    );

    let applied = engine
        .run_reconciliation(&ReconciliationOptionsInput::default())
        .await?;
    println!("{}", serde_json::to_string_pretty(&applied)?);

    for review in &applied.manual_candidates {
        if let Some(best) = review.possible_matches.first() {
            let outcome = engine
                .create_manual_link(
                    &review.movement_id,
                    &best.history_id,
                    "Confirmed against the fuel receipt",
                )
                .await?;
            println!("{}: {}", review.movement_id, outcome.message);
        }
    }

    Ok(())
}

//! # Movement Reconciliation
//!
//! Links cash-register movements to the contract history entries that
//! describe the same rental event, using a confidence score built from
//! amount, time, vehicle, beneficiary and creation proximity.
//!
//! ## Features
//!
//! - **Scoring**: additive, explainable per-feature points clamped to 0..=100
//! - **Ranking**: deterministic ordering with a bounded candidate list
//! - **Classification**: auto-link, manual review, or unmatched
//! - **Linking**: bidirectional links re-checked immediately before writing
//! - **Manual override**: operator-forced links with an audit reason
//! - **Storage abstraction**: trait-based stores for movements and history
//!
//! ## Quick Start
//!
//! ```rust
//! use movement_reconciliation::{ReconciliationEngine, ReconciliationOptionsInput};
//! use movement_reconciliation::utils::MemoryStorage;
//!
//! // Any MovementStore / ContractHistoryStore implementation works here
//! let storage = MemoryStorage::new();
//! let engine = ReconciliationEngine::new(storage.clone(), storage);
//! let options = ReconciliationOptionsInput::dry_run();
//! // let result = engine.run_reconciliation(&options).await?;
//! # let _ = (engine, options);
//! ```

pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use reconciliation::*;
pub use traits::*;
pub use types::*;

//! Reconciliation of cash movements against contract history entries
//!
//! Scoring, ranking and classification are pure functions. The engine drives
//! them over the stores and routes every write through the [`Linker`].

pub mod engine;
pub mod linker;
pub mod manual;
pub mod options;
pub mod ranking;
pub mod report;
pub mod scoring;

pub use engine::*;
pub use linker::*;
pub use manual::*;
pub use options::*;
pub use ranking::*;
pub use report::*;
pub use scoring::*;

//! Domain models for the Reseller Ledger platform
//!
//! Re-exports the models and value types from the shared crate

pub use shared::models::*;
pub use shared::types::{RecordStatus, TimeWindow};

//! Shared domain types and rules for the Reseller Ledger platform
//!
//! Everything in this crate is free of I/O: models, status transitions,
//! order pricing, payment settlement and balance arithmetic. The backend
//! persists these types; the rules live here so they can be tested in
//! isolation.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;

//! HTTP handlers for the Reseller Ledger API

pub mod auth;
pub mod balance;
pub mod dashboard;
pub mod health;
pub mod order;
pub mod payment;
pub mod product;
pub mod reseller;
pub mod transaction;

pub use auth::*;
pub use balance::*;
pub use dashboard::*;
pub use health::*;
pub use order::*;
pub use payment::*;
pub use product::*;
pub use reseller::*;
pub use transaction::*;

//! Domain models for the Reseller Ledger platform

mod balance;
mod dashboard;
mod order;
mod payment;
mod product;
mod reseller;
mod transaction;
mod user;

pub use balance::*;
pub use dashboard::*;
pub use order::*;
pub use payment::*;
pub use product::*;
pub use reseller::*;
pub use transaction::*;
pub use user::*;

//! Business logic services for the Reseller Ledger platform
//!
//! Every service operation runs as one store transaction under the configured
//! deadline.

use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};
use crate::models::{Balance, NewTransaction, Transaction};
use crate::store::StoreTx;

pub mod auth;
pub mod balance;
pub mod dashboard;
pub mod ledger;
pub mod order;
pub mod product;
pub mod reseller;

pub use auth::AuthService;
pub use balance::BalanceService;
pub use dashboard::DashboardService;
pub use ledger::LedgerService;
pub use order::OrderService;
pub use product::ProductService;
pub use reseller::ResellerService;

/// Attach a field name to a domain rule failure
pub(crate) fn check(field: &str, rule: Result<(), &'static str>) -> AppResult<()> {
    rule.map_err(|message| AppError::validation(field, message))
}

/// Append a ledger entry and move the balance with it.
///
/// The balance is checked before anything is written, so a refused cash-out
/// leaves the ledger untouched.
pub(crate) async fn post_entry(
    tx: &mut dyn StoreTx,
    entry: NewTransaction,
    now: DateTime<Utc>,
) -> AppResult<(Transaction, Balance)> {
    let mut balance = tx.lock_balance(now).await?;
    balance.apply(entry.transaction_type, entry.amount, now)?;

    let transaction = entry.into_transaction(now);
    tx.append_transaction(&transaction).await?;
    let balance = tx.save_balance(&balance).await?;

    Ok((transaction, balance))
}

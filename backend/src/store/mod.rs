//! Storage contracts for the Reseller Ledger platform
//!
//! Each entity has its own repository trait. A [`StoreTx`] is one storage
//! transaction implementing all of them, so services can compose several
//! entities into a single atomic unit while the per-entity boundaries stay
//! explicit and replaceable. Nothing is visible to other transactions until
//! [`StoreTx::commit`]; dropping a transaction rolls it back.
//!
//! Soft-deleted rows (`deleted_at IS NOT NULL`) are never returned by any
//! read method.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Balance, LedgerTotals, Order, Payment, Product, Reseller, TimeWindow, Transaction, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Reseller master data
#[async_trait]
pub trait ResellerRepository: Send {
    async fn insert_reseller(&mut self, reseller: &Reseller) -> AppResult<()>;

    async fn find_reseller(&mut self, id: Uuid) -> AppResult<Option<Reseller>>;

    async fn list_resellers(&mut self) -> AppResult<Vec<Reseller>>;

    async fn update_reseller(&mut self, reseller: &Reseller) -> AppResult<()>;

    /// Returns false when no live reseller matched
    async fn soft_delete_reseller(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;
}

/// Product catalog and stock counters
#[async_trait]
pub trait ProductRepository: Send {
    async fn insert_product(&mut self, product: &Product) -> AppResult<()>;

    async fn find_product(&mut self, id: Uuid) -> AppResult<Option<Product>>;

    /// Read a product and hold it against concurrent writers until commit
    async fn lock_product(&mut self, id: Uuid) -> AppResult<Option<Product>>;

    async fn list_products(&mut self) -> AppResult<Vec<Product>>;

    /// Active products with `current_stock <= min_stock_alert`
    async fn list_low_stock_products(&mut self) -> AppResult<Vec<Product>>;

    async fn update_product(&mut self, product: &Product) -> AppResult<()>;

    /// Atomically add `delta` to the stock counter.
    ///
    /// Returns the new stock, or `None` when the product is missing or the
    /// change would take the stock below zero. The counter is untouched in
    /// that case.
    async fn adjust_stock(&mut self, id: Uuid, delta: i32) -> AppResult<Option<i32>>;

    /// Number of live order items referencing the product
    async fn count_order_items_for_product(&mut self, id: Uuid) -> AppResult<i64>;

    async fn soft_delete_product(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;
}

/// Orders and their items, always read and written together
#[async_trait]
pub trait OrderRepository: Send {
    async fn insert_order(&mut self, order: &Order) -> AppResult<()>;

    async fn find_order(&mut self, id: Uuid) -> AppResult<Option<Order>>;

    async fn lock_order(&mut self, id: Uuid) -> AppResult<Option<Order>>;

    /// Newest first
    async fn list_orders(&mut self) -> AppResult<Vec<Order>>;

    async fn list_orders_by_reseller(&mut self, reseller_id: Uuid) -> AppResult<Vec<Order>>;

    /// Orders whose payment status is unpaid or partially paid
    async fn list_outstanding_orders(&mut self) -> AppResult<Vec<Order>>;

    /// Persist header fields only; items are immutable once created
    async fn update_order(&mut self, order: &Order) -> AppResult<()>;

    /// Soft-delete the items, then the order
    async fn soft_delete_order(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;
}

/// One payment record per order
#[async_trait]
pub trait PaymentRepository: Send {
    async fn insert_payment(&mut self, payment: &Payment) -> AppResult<()>;

    async fn find_payment_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Payment>>;

    async fn lock_payment_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Payment>>;

    async fn list_payments(&mut self) -> AppResult<Vec<Payment>>;

    async fn update_payment(&mut self, payment: &Payment) -> AppResult<()>;
}

/// Append-only cash ledger
#[async_trait]
pub trait LedgerRepository: Send {
    async fn append_transaction(&mut self, transaction: &Transaction) -> AppResult<()>;

    /// Newest first by creation time, optionally limited
    async fn list_transactions(&mut self, limit: Option<i64>) -> AppResult<Vec<Transaction>>;

    /// Totals over the whole ledger
    async fn ledger_totals(&mut self) -> AppResult<LedgerTotals>;

    /// Totals over entries dated within `[window.start, window.end)`
    async fn window_totals(&mut self, window: &TimeWindow) -> AppResult<LedgerTotals>;
}

/// The singleton balance record
#[async_trait]
pub trait BalanceRepository: Send {
    /// Create the zero balance if it does not exist yet; idempotent
    async fn ensure_balance(&mut self, now: DateTime<Utc>) -> AppResult<Balance>;

    /// Read the balance (creating it if needed) and hold it until commit
    async fn lock_balance(&mut self, now: DateTime<Utc>) -> AppResult<Balance>;

    /// Write the balance back if nobody else changed it since it was read.
    ///
    /// `balance.version` must be the version that was read; the stored
    /// version is bumped. Fails with [`AppError::ConcurrentModification`]
    /// otherwise.
    async fn save_balance(&mut self, balance: &Balance) -> AppResult<Balance>;
}

/// Operator accounts
#[async_trait]
pub trait UserRepository: Send {
    async fn insert_user(&mut self, user: &User, password_hash: &str) -> AppResult<()>;

    /// The user and its password hash
    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<(User, String)>>;

    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>>;
}

/// A storage transaction spanning every repository
#[async_trait]
pub trait StoreTx:
    ResellerRepository
    + ProductRepository
    + OrderRepository
    + PaymentRepository
    + LedgerRepository
    + BalanceRepository
    + UserRepository
    + Send
{
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Entry point to a storage backend
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    /// Backend name for logs and health output
    fn name(&self) -> &'static str;
}

/// Run a store operation under a deadline.
///
/// On expiry the operation's future is dropped, which rolls back any open
/// transaction, and the caller gets a retryable [`AppError::StoreTimeout`].
pub async fn with_deadline<T, F>(limit: Duration, operation: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "Store transaction timed out");
            Err(AppError::StoreTimeout)
        }
    }
}


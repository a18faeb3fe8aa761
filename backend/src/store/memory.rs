//! In-memory storage adapter
//!
//! Transactions are serialized behind one async mutex. A transaction works on
//! a private copy of the state which replaces the shared state on commit, so
//! an uncommitted or failed transaction leaves no trace. Used by the test
//! suites and for running the server without a database.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    BalanceRepository, LedgerRepository, OrderRepository, PaymentRepository, ProductRepository,
    ResellerRepository, Store, StoreTx, UserRepository,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Balance, LedgerTotals, Order, Payment, Product, Reseller, TimeWindow, Transaction, User,
};

/// Write operations that can be made to fail, for exercising rollback paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertOrder,
    InsertPayment,
    AppendTransaction,
    SaveBalance,
}

#[derive(Debug, Clone)]
struct Row<T> {
    value: T,
    deleted_at: Option<DateTime<Utc>>,
}

impl<T> Row<T> {
    fn live(value: T) -> Self {
        Self {
            value,
            deleted_at: None,
        }
    }

    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    resellers: Vec<Row<Reseller>>,
    products: Vec<Row<Product>>,
    orders: Vec<Row<Order>>,
    payments: Vec<Row<Payment>>,
    transactions: Vec<Transaction>,
    balance: Option<Balance>,
    users: Vec<Row<(User, String)>>,
}

/// Process-local store with serializable transactions
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_points: Arc<StdMutex<HashSet<FailPoint>>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `begin` by `latency`, simulating a slow database
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next call of the given write operation fail
    pub fn fail_next(&self, point: FailPoint) {
        if let Ok(mut points) = self.fail_points.lock() {
            points.insert(point);
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_points: self.fail_points.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// A transaction over a private copy of the store state
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_points: Arc<StdMutex<HashSet<FailPoint>>>,
}

impl MemoryTx {
    fn trip(&self, point: FailPoint) -> AppResult<()> {
        let tripped = self
            .fail_points
            .lock()
            .map(|mut points| points.remove(&point))
            .unwrap_or(false);
        if tripped {
            return Err(AppError::Internal(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }

    fn live_order(&self, id: Uuid) -> Option<&Order> {
        self.working
            .orders
            .iter()
            .find(|row| row.is_live() && row.value.id == id)
            .map(|row| &row.value)
    }

    fn orders_where(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .working
            .orders
            .iter()
            .filter(|row| row.is_live() && predicate(&row.value))
            .map(|row| row.value.clone())
            .collect();
        orders.reverse();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl ResellerRepository for MemoryTx {
    async fn insert_reseller(&mut self, reseller: &Reseller) -> AppResult<()> {
        let taken = self
            .working
            .resellers
            .iter()
            .any(|row| row.is_live() && row.value.email.eq_ignore_ascii_case(&reseller.email));
        if taken {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }
        self.working.resellers.push(Row::live(reseller.clone()));
        Ok(())
    }

    async fn find_reseller(&mut self, id: Uuid) -> AppResult<Option<Reseller>> {
        Ok(self
            .working
            .resellers
            .iter()
            .find(|row| row.is_live() && row.value.id == id)
            .map(|row| row.value.clone()))
    }

    async fn list_resellers(&mut self) -> AppResult<Vec<Reseller>> {
        let mut resellers: Vec<Reseller> = self
            .working
            .resellers
            .iter()
            .filter(|row| row.is_live())
            .map(|row| row.value.clone())
            .collect();
        resellers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resellers)
    }

    async fn update_reseller(&mut self, reseller: &Reseller) -> AppResult<()> {
        let taken = self.working.resellers.iter().any(|row| {
            row.is_live()
                && row.value.id != reseller.id
                && row.value.email.eq_ignore_ascii_case(&reseller.email)
        });
        if taken {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }
        match self
            .working
            .resellers
            .iter_mut()
            .find(|row| row.is_live() && row.value.id == reseller.id)
        {
            Some(row) => {
                row.value = reseller.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Reseller".to_string())),
        }
    }

    async fn soft_delete_reseller(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        match self
            .working
            .resellers
            .iter_mut()
            .find(|row| row.is_live() && row.value.id == id)
        {
            Some(row) => {
                row.deleted_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryTx {
    async fn insert_product(&mut self, product: &Product) -> AppResult<()> {
        let taken = self
            .working
            .products
            .iter()
            .any(|row| row.is_live() && row.value.sku == product.sku);
        if taken {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }
        self.working.products.push(Row::live(product.clone()));
        Ok(())
    }

    async fn find_product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self
            .working
            .products
            .iter()
            .find(|row| row.is_live() && row.value.id == id)
            .map(|row| row.value.clone()))
    }

    async fn lock_product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        // The whole state is already held exclusively by this transaction
        self.find_product(id).await
    }

    async fn list_products(&mut self) -> AppResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .working
            .products
            .iter()
            .filter(|row| row.is_live())
            .map(|row| row.value.clone())
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn list_low_stock_products(&mut self) -> AppResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .working
            .products
            .iter()
            .filter(|row| row.is_live() && row.value.is_low_stock())
            .map(|row| row.value.clone())
            .collect();
        products.sort_by_key(|p| p.current_stock);
        Ok(products)
    }

    async fn update_product(&mut self, product: &Product) -> AppResult<()> {
        let taken = self.working.products.iter().any(|row| {
            row.is_live() && row.value.id != product.id && row.value.sku == product.sku
        });
        if taken {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }
        match self
            .working
            .products
            .iter_mut()
            .find(|row| row.is_live() && row.value.id == product.id)
        {
            Some(row) => {
                row.value = product.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Product".to_string())),
        }
    }

    async fn adjust_stock(&mut self, id: Uuid, delta: i32) -> AppResult<Option<i32>> {
        let Some(row) = self
            .working
            .products
            .iter_mut()
            .find(|row| row.is_live() && row.value.id == id)
        else {
            return Ok(None);
        };

        match row.value.current_stock.checked_add(delta) {
            Some(next) if next >= 0 => {
                row.value.current_stock = next;
                row.value.updated_at = Utc::now();
                Ok(Some(next))
            }
            _ => Ok(None),
        }
    }

    async fn count_order_items_for_product(&mut self, id: Uuid) -> AppResult<i64> {
        let count = self
            .working
            .orders
            .iter()
            .filter(|row| row.is_live())
            .flat_map(|row| row.value.order_items.iter())
            .filter(|item| item.product_id == id)
            .count();
        Ok(count as i64)
    }

    async fn soft_delete_product(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        match self
            .working
            .products
            .iter_mut()
            .find(|row| row.is_live() && row.value.id == id)
        {
            Some(row) => {
                row.deleted_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl OrderRepository for MemoryTx {
    async fn insert_order(&mut self, order: &Order) -> AppResult<()> {
        self.trip(FailPoint::InsertOrder)?;
        let reseller_exists = self
            .working
            .resellers
            .iter()
            .any(|row| row.is_live() && row.value.id == order.reseller_id);
        if !reseller_exists {
            return Err(AppError::NotFound("Reseller".to_string()));
        }
        self.working.orders.push(Row::live(order.clone()));
        Ok(())
    }

    async fn find_order(&mut self, id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.live_order(id).cloned())
    }

    async fn lock_order(&mut self, id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.live_order(id).cloned())
    }

    async fn list_orders(&mut self) -> AppResult<Vec<Order>> {
        Ok(self.orders_where(|_| true))
    }

    async fn list_orders_by_reseller(&mut self, reseller_id: Uuid) -> AppResult<Vec<Order>> {
        Ok(self.orders_where(|order| order.reseller_id == reseller_id))
    }

    async fn list_outstanding_orders(&mut self) -> AppResult<Vec<Order>> {
        Ok(self.orders_where(Order::is_outstanding))
    }

    async fn update_order(&mut self, order: &Order) -> AppResult<()> {
        match self
            .working
            .orders
            .iter_mut()
            .find(|row| row.is_live() && row.value.id == order.id)
        {
            Some(row) => {
                let stored = &mut row.value;
                stored.reseller_id = order.reseller_id;
                stored.status = order.status;
                stored.payment_status = order.payment_status;
                stored.notes = order.notes.clone();
                stored.updated_at = order.updated_at;
                Ok(())
            }
            None => Err(AppError::NotFound("Order".to_string())),
        }
    }

    async fn soft_delete_order(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        match self
            .working
            .orders
            .iter_mut()
            .find(|row| row.is_live() && row.value.id == id)
        {
            Some(row) => {
                row.deleted_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PaymentRepository for MemoryTx {
    async fn insert_payment(&mut self, payment: &Payment) -> AppResult<()> {
        self.trip(FailPoint::InsertPayment)?;
        let taken = self
            .working
            .payments
            .iter()
            .any(|row| row.is_live() && row.value.order_id == payment.order_id);
        if taken {
            return Err(AppError::DuplicateEntry("order_id".to_string()));
        }
        self.working.payments.push(Row::live(payment.clone()));
        Ok(())
    }

    async fn find_payment_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Payment>> {
        Ok(self
            .working
            .payments
            .iter()
            .find(|row| row.is_live() && row.value.order_id == order_id)
            .map(|row| row.value.clone()))
    }

    async fn lock_payment_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Payment>> {
        self.find_payment_by_order(order_id).await
    }

    async fn list_payments(&mut self) -> AppResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .working
            .payments
            .iter()
            .filter(|row| row.is_live())
            .map(|row| row.value.clone())
            .collect();
        payments.reverse();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn update_payment(&mut self, payment: &Payment) -> AppResult<()> {
        match self
            .working
            .payments
            .iter_mut()
            .find(|row| row.is_live() && row.value.id == payment.id)
        {
            Some(row) => {
                row.value = payment.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Payment".to_string())),
        }
    }
}

#[async_trait]
impl LedgerRepository for MemoryTx {
    async fn append_transaction(&mut self, transaction: &Transaction) -> AppResult<()> {
        self.trip(FailPoint::AppendTransaction)?;
        self.working.transactions.push(transaction.clone());
        Ok(())
    }

    async fn list_transactions(&mut self, limit: Option<i64>) -> AppResult<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> =
            self.working.transactions.iter().rev().cloned().collect();
        // Stable sort keeps later appends first among equal timestamps
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            transactions.truncate(limit.max(0) as usize);
        }
        Ok(transactions)
    }

    async fn ledger_totals(&mut self) -> AppResult<LedgerTotals> {
        let mut totals = LedgerTotals::default();
        for tx in &self.working.transactions {
            totals.add(tx.transaction_type, tx.amount);
        }
        Ok(totals)
    }

    async fn window_totals(&mut self, window: &TimeWindow) -> AppResult<LedgerTotals> {
        let mut totals = LedgerTotals::default();
        for tx in self
            .working
            .transactions
            .iter()
            .filter(|tx| window.contains(tx.date))
        {
            totals.add(tx.transaction_type, tx.amount);
        }
        Ok(totals)
    }
}

#[async_trait]
impl BalanceRepository for MemoryTx {
    async fn ensure_balance(&mut self, now: DateTime<Utc>) -> AppResult<Balance> {
        Ok(self
            .working
            .balance
            .get_or_insert_with(|| Balance::zero(now))
            .clone())
    }

    async fn lock_balance(&mut self, now: DateTime<Utc>) -> AppResult<Balance> {
        self.ensure_balance(now).await
    }

    async fn save_balance(&mut self, balance: &Balance) -> AppResult<Balance> {
        self.trip(FailPoint::SaveBalance)?;
        match self.working.balance.as_mut() {
            Some(stored) if stored.version == balance.version => {
                *stored = Balance {
                    version: balance.version + 1,
                    ..balance.clone()
                };
                Ok(stored.clone())
            }
            _ => Err(AppError::ConcurrentModification("balance".to_string())),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryTx {
    async fn insert_user(&mut self, user: &User, password_hash: &str) -> AppResult<()> {
        let taken = self
            .working
            .users
            .iter()
            .any(|row| row.is_live() && row.value.0.email.eq_ignore_ascii_case(&user.email));
        if taken {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }
        self.working
            .users
            .push(Row::live((user.clone(), password_hash.to_string())));
        Ok(())
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<(User, String)>> {
        Ok(self
            .working
            .users
            .iter()
            .find(|row| row.is_live() && row.value.0.email.eq_ignore_ascii_case(email))
            .map(|row| row.value.clone()))
    }

    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self
            .working
            .users
            .iter()
            .find(|row| row.is_live() && row.value.0.id == id)
            .map(|row| row.value.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;
    use rust_decimal_macros::dec;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Sunscreen".to_string(),
            description: None,
            sku: "SUN-050".to_string(),
            price: dec!(12.50),
            current_stock: stock,
            min_stock_alert: 2,
            status: RecordStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_is_discarded() {
        let store = MemoryStore::new();
        let p = product(5);

        let mut tx = store.begin().await.unwrap();
        tx.insert_product(&p).await.unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_product(p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let store = MemoryStore::new();
        let p = product(3);
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(&p).await.unwrap();

        assert_eq!(tx.adjust_stock(p.id, -3).await.unwrap(), Some(0));
        assert_eq!(tx.adjust_stock(p.id, -1).await.unwrap(), None);
        assert_eq!(tx.adjust_stock(Uuid::new_v4(), 1).await.unwrap(), None);
        assert_eq!(tx.find_product(p.id).await.unwrap().unwrap().current_stock, 0);
    }

    #[tokio::test]
    async fn test_stale_balance_version_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut balance = tx.lock_balance(Utc::now()).await.unwrap();
        balance.current_balance = dec!(10);
        let saved = tx.save_balance(&balance).await.unwrap();
        assert_eq!(saved.version, 1);

        // Writing again with the version that was read before is a lost update
        let err = tx.save_balance(&balance).await.unwrap_err();
        assert!(matches!(err, AppError::ConcurrentModification(_)));
    }

    #[tokio::test]
    async fn test_fail_point_trips_once() {
        let store = MemoryStore::new();
        store.fail_next(FailPoint::SaveBalance);
        let mut tx = store.begin().await.unwrap();
        let balance = tx.lock_balance(Utc::now()).await.unwrap();
        assert!(tx.save_balance(&balance).await.is_err());
        assert!(tx.save_balance(&balance).await.is_ok());
    }

    #[tokio::test]
    async fn test_soft_deleted_product_is_hidden() {
        let store = MemoryStore::new();
        let p = product(1);
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(&p).await.unwrap();
        assert!(tx.soft_delete_product(p.id, Utc::now()).await.unwrap());
        assert!(tx.find_product(p.id).await.unwrap().is_none());
        assert!(tx.list_products().await.unwrap().is_empty());
        assert!(!tx.soft_delete_product(p.id, Utc::now()).await.unwrap());
    }
}

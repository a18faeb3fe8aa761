//! PostgreSQL storage adapter
//!
//! Enumerations are stored as text columns guarded by CHECK constraints and
//! parsed back through their `FromStr` impls. Row locks (`FOR UPDATE`) keep
//! concurrent transactions on the same product, order or balance serialized.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

use super::{
    BalanceRepository, LedgerRepository, OrderRepository, PaymentRepository, ProductRepository,
    ResellerRepository, Store, StoreTx, UserRepository,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Balance, LedgerTotals, Order, OrderItem, Payment, Product, Reseller, TimeWindow, Transaction,
    User, BALANCE_KEY,
};

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// One database transaction; rolled back by sqlx when dropped uncommitted
pub struct PgTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn parse<T: FromStr>(value: &str) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    T::from_str(value).map_err(|e| AppError::Internal(format!("Corrupt row: {}", e)))
}

/// Translate constraint violations into domain errors
fn constraint_error(err: sqlx::Error, unique_field: &str, missing: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::DuplicateEntry(unique_field.to_string());
        }
        if db.is_foreign_key_violation() {
            return AppError::NotFound(missing.to_string());
        }
    }
    AppError::DatabaseError(err)
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct ResellerRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ResellerRow> for Reseller {
    type Error = AppError;

    fn try_from(row: ResellerRow) -> AppResult<Self> {
        Ok(Reseller {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            status: parse(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    sku: String,
    price: Decimal,
    current_stock: i32,
    min_stock_alert: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> AppResult<Self> {
        Ok(Product {
            id: row.id,
            name: row.name,
            description: row.description,
            sku: row.sku,
            price: row.price,
            current_stock: row.current_stock,
            min_stock_alert: row.min_stock_alert,
            status: parse(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    reseller_id: Uuid,
    total_amount: Decimal,
    status: String,
    payment_status: String,
    order_date: DateTime<Utc>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, order_items: Vec<OrderItem>) -> AppResult<Order> {
        Ok(Order {
            id: self.id,
            reseller_id: self.reseller_id,
            order_items,
            total_amount: self.total_amount,
            status: parse(&self.status)?,
            payment_status: parse(&self.payment_status)?,
            order_date: self.order_date,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price: Decimal,
    subtotal: Decimal,
    created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price: row.price,
            subtotal: row.subtotal,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    total_amount: Decimal,
    amount_paid: Decimal,
    status: String,
    payment_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> AppResult<Self> {
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            total_amount: row.total_amount,
            amount_paid: row.amount_paid,
            status: parse(&row.status)?,
            payment_date: row.payment_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    transaction_type: String,
    category: String,
    amount: Decimal,
    description: Option<String>,
    date: DateTime<Utc>,
    reference_id: Option<Uuid>,
    payment_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> AppResult<Self> {
        Ok(Transaction {
            id: row.id,
            transaction_type: parse(&row.transaction_type)?,
            category: parse(&row.category)?,
            amount: row.amount,
            description: row.description,
            date: row.date,
            reference_id: row.reference_id,
            payment_id: row.payment_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BalanceRow {
    id: String,
    initial_balance: Decimal,
    current_balance: Decimal,
    notes: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BalanceRow> for Balance {
    fn from(row: BalanceRow) -> Self {
        Balance {
            id: row.id,
            initial_balance: row.initial_balance,
            current_balance: row.current_balance,
            notes: row.notes,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> (User, String) {
        (
            User {
                id: self.id,
                name: self.name,
                email: self.email,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            self.password_hash,
        )
    }
}

const RESELLER_COLUMNS: &str =
    "id, name, email, phone, address, status, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, description, sku, price, current_stock, \
     min_stock_alert, status, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, reseller_id, total_amount, status, payment_status, \
     order_date, notes, created_at, updated_at";
const PAYMENT_COLUMNS: &str = "id, order_id, total_amount, amount_paid, status, payment_date, \
     notes, created_at, updated_at";
const TRANSACTION_COLUMNS: &str = "id, transaction_type, category, amount, description, date, \
     reference_id, payment_id, created_at";
const BALANCE_COLUMNS: &str =
    "id, initial_balance, current_balance, notes, version, created_at, updated_at";

impl PgTx {
    /// Attach live items to a batch of order rows, preserving row order
    async fn with_items(&mut self, rows: Vec<OrderRow>) -> AppResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, quantity, price, subtotal, created_at
            FROM order_items
            WHERE order_id = ANY($1) AND deleted_at IS NULL
            ORDER BY created_at, id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item.into());
        }

        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    async fn fetch_order(&mut self, id: Uuid, lock: bool) -> AppResult<Option<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE id = $1 AND deleted_at IS NULL{}",
            ORDER_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn fetch_orders(&mut self, filter: &str, reseller_id: Option<Uuid>) -> AppResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE deleted_at IS NULL{} ORDER BY created_at DESC",
            ORDER_COLUMNS, filter
        );
        let mut query = sqlx::query_as::<_, OrderRow>(&sql);
        if let Some(reseller_id) = reseller_id {
            query = query.bind(reseller_id);
        }
        let rows = query.fetch_all(&mut *self.tx).await?;
        self.with_items(rows).await
    }

    async fn fetch_product(&mut self, id: Uuid, lock: bool) -> AppResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = $1 AND deleted_at IS NULL{}",
            PRODUCT_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn fetch_payment(&mut self, order_id: Uuid, lock: bool) -> AppResult<Option<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE order_id = $1 AND deleted_at IS NULL{}",
            PAYMENT_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(order_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Payment::try_from)
            .transpose()
    }

    async fn totals_where(&mut self, filter: &str, window: Option<&TimeWindow>) -> AppResult<LedgerTotals> {
        let sql = format!(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'CASH_IN'), 0),
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'CASH_OUT'), 0)
            FROM transactions
            {}
            "#,
            filter
        );
        let mut query = sqlx::query_as::<_, (Decimal, Decimal)>(&sql);
        if let Some(window) = window {
            query = query.bind(window.start).bind(window.end);
        }
        let (cash_in, cash_out) = query.fetch_one(&mut *self.tx).await?;
        Ok(LedgerTotals { cash_in, cash_out })
    }
}

// ============================================================================
// Repositories
// ============================================================================

#[async_trait]
impl ResellerRepository for PgTx {
    async fn insert_reseller(&mut self, reseller: &Reseller) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO resellers (id, name, email, phone, address, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reseller.id)
        .bind(&reseller.name)
        .bind(&reseller.email)
        .bind(&reseller.phone)
        .bind(&reseller.address)
        .bind(reseller.status.as_str())
        .bind(reseller.created_at)
        .bind(reseller.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| constraint_error(e, "email", "Reseller"))?;
        Ok(())
    }

    async fn find_reseller(&mut self, id: Uuid) -> AppResult<Option<Reseller>> {
        let sql = format!(
            "SELECT {} FROM resellers WHERE id = $1 AND deleted_at IS NULL",
            RESELLER_COLUMNS
        );
        sqlx::query_as::<_, ResellerRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Reseller::try_from)
            .transpose()
    }

    async fn list_resellers(&mut self) -> AppResult<Vec<Reseller>> {
        let sql = format!(
            "SELECT {} FROM resellers WHERE deleted_at IS NULL ORDER BY name",
            RESELLER_COLUMNS
        );
        sqlx::query_as::<_, ResellerRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Reseller::try_from)
            .collect()
    }

    async fn update_reseller(&mut self, reseller: &Reseller) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE resellers
            SET name = $2, email = $3, phone = $4, address = $5, status = $6, updated_at = $7
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(reseller.id)
        .bind(&reseller.name)
        .bind(&reseller.email)
        .bind(&reseller.phone)
        .bind(&reseller.address)
        .bind(reseller.status.as_str())
        .bind(reseller.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| constraint_error(e, "email", "Reseller"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Reseller".to_string()));
        }
        Ok(())
    }

    async fn soft_delete_reseller(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE resellers SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductRepository for PgTx {
    async fn insert_product(&mut self, product: &Product) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, description, sku, price, current_stock, min_stock_alert, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(product.price)
        .bind(product.current_stock)
        .bind(product.min_stock_alert)
        .bind(product.status.as_str())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| constraint_error(e, "sku", "Product"))?;
        Ok(())
    }

    async fn find_product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        self.fetch_product(id, false).await
    }

    async fn lock_product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        self.fetch_product(id, true).await
    }

    async fn list_products(&mut self) -> AppResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE deleted_at IS NULL ORDER BY name",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn list_low_stock_products(&mut self) -> AppResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {} FROM products
            WHERE deleted_at IS NULL AND status = 'active' AND current_stock <= min_stock_alert
            ORDER BY current_stock
            "#,
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn update_product(&mut self, product: &Product) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, sku = $4, price = $5, current_stock = $6,
                min_stock_alert = $7, status = $8, updated_at = $9
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(product.price)
        .bind(product.current_stock)
        .bind(product.min_stock_alert)
        .bind(product.status.as_str())
        .bind(product.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| constraint_error(e, "sku", "Product"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }

    async fn adjust_stock(&mut self, id: Uuid, delta: i32) -> AppResult<Option<i32>> {
        // The guard in the WHERE clause makes check-and-decrement a single statement
        let stock = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET current_stock = current_stock + $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND current_stock + $2 >= 0
            RETURNING current_stock
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(stock)
    }

    async fn count_order_items_for_product(&mut self, id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM order_items WHERE product_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn soft_delete_product(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for PgTx {
    async fn insert_order(&mut self, order: &Order) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, reseller_id, total_amount, status, payment_status, order_date, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id)
        .bind(order.reseller_id)
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.order_date)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| constraint_error(e, "id", "Reseller"))?;

        for item in &order.order_items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, price, subtotal, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.subtotal)
            .bind(item.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| constraint_error(e, "id", "Product"))?;
        }
        Ok(())
    }

    async fn find_order(&mut self, id: Uuid) -> AppResult<Option<Order>> {
        self.fetch_order(id, false).await
    }

    async fn lock_order(&mut self, id: Uuid) -> AppResult<Option<Order>> {
        self.fetch_order(id, true).await
    }

    async fn list_orders(&mut self) -> AppResult<Vec<Order>> {
        self.fetch_orders("", None).await
    }

    async fn list_orders_by_reseller(&mut self, reseller_id: Uuid) -> AppResult<Vec<Order>> {
        self.fetch_orders(" AND reseller_id = $1", Some(reseller_id))
            .await
    }

    async fn list_outstanding_orders(&mut self) -> AppResult<Vec<Order>> {
        self.fetch_orders(" AND payment_status IN ('unpaid', 'partially_paid')", None)
            .await
    }

    async fn update_order(&mut self, order: &Order) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET reseller_id = $2, status = $3, payment_status = $4, notes = $5, updated_at = $6
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(order.id)
        .bind(order.reseller_id)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.notes)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| constraint_error(e, "id", "Reseller"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Order".to_string()));
        }
        Ok(())
    }

    async fn soft_delete_order(&mut self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        sqlx::query("UPDATE order_items SET deleted_at = $2 WHERE order_id = $1 AND deleted_at IS NULL")
            .bind(id)
            .bind(at)
            .execute(&mut *self.tx)
            .await?;

        let result =
            sqlx::query("UPDATE orders SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .bind(at)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PaymentRepository for PgTx {
    async fn insert_payment(&mut self, payment: &Payment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (id, order_id, total_amount, amount_paid, status, payment_date, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id)
        .bind(payment.order_id)
        .bind(payment.total_amount)
        .bind(payment.amount_paid)
        .bind(payment.status.as_str())
        .bind(payment.payment_date)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| constraint_error(e, "order_id", "Order"))?;
        Ok(())
    }

    async fn find_payment_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Payment>> {
        self.fetch_payment(order_id, false).await
    }

    async fn lock_payment_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Payment>> {
        self.fetch_payment(order_id, true).await
    }

    async fn list_payments(&mut self) -> AppResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE deleted_at IS NULL ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Payment::try_from)
            .collect()
    }

    async fn update_payment(&mut self, payment: &Payment) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET amount_paid = $2, status = $3, payment_date = $4, notes = $5, updated_at = $6
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(payment.id)
        .bind(payment.amount_paid)
        .bind(payment.status.as_str())
        .bind(payment.payment_date)
        .bind(&payment.notes)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Payment".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for PgTx {
    async fn append_transaction(&mut self, transaction: &Transaction) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, transaction_type, category, amount, description, date, reference_id, payment_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.category.as_str())
        .bind(transaction.amount)
        .bind(&transaction.description)
        .bind(transaction.date)
        .bind(transaction.reference_id)
        .bind(transaction.payment_id)
        .bind(transaction.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn list_transactions(&mut self, limit: Option<i64>) -> AppResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions ORDER BY created_at DESC, seq DESC LIMIT $1",
            TRANSACTION_COLUMNS
        );
        // NULL means no limit in PostgreSQL
        sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(limit)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn ledger_totals(&mut self) -> AppResult<LedgerTotals> {
        self.totals_where("", None).await
    }

    async fn window_totals(&mut self, window: &TimeWindow) -> AppResult<LedgerTotals> {
        self.totals_where("WHERE date >= $1 AND date < $2", Some(window))
            .await
    }
}

#[async_trait]
impl BalanceRepository for PgTx {
    async fn ensure_balance(&mut self, now: DateTime<Utc>) -> AppResult<Balance> {
        sqlx::query(
            r#"
            INSERT INTO balances (id, initial_balance, current_balance, version, created_at, updated_at)
            VALUES ($1, 0, 0, 0, $2, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(BALANCE_KEY)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        let sql = format!("SELECT {} FROM balances WHERE id = $1", BALANCE_COLUMNS);
        let row = sqlx::query_as::<_, BalanceRow>(&sql)
            .bind(BALANCE_KEY)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row.into())
    }

    async fn lock_balance(&mut self, now: DateTime<Utc>) -> AppResult<Balance> {
        self.ensure_balance(now).await?;
        let sql = format!(
            "SELECT {} FROM balances WHERE id = $1 FOR UPDATE",
            BALANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, BalanceRow>(&sql)
            .bind(BALANCE_KEY)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row.into())
    }

    async fn save_balance(&mut self, balance: &Balance) -> AppResult<Balance> {
        let sql = format!(
            r#"
            UPDATE balances
            SET initial_balance = $2, current_balance = $3, notes = $4,
                version = version + 1, updated_at = $5
            WHERE id = $1 AND version = $6
            RETURNING {}
            "#,
            BALANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, BalanceRow>(&sql)
            .bind(&balance.id)
            .bind(balance.initial_balance)
            .bind(balance.current_balance)
            .bind(&balance.notes)
            .bind(balance.updated_at)
            .bind(balance.version)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(Balance::from)
            .ok_or_else(|| AppError::ConcurrentModification("balance".to_string()))
    }
}

#[async_trait]
impl UserRepository for PgTx {
    async fn insert_user(&mut self, user: &User, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| constraint_error(e, "email", "User"))?;
        Ok(())
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<(User, String)>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(UserRow::into_user))
    }

    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|row| row.into_user().0))
    }
}

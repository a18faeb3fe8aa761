//! Order orchestration: creation with stock reservation, updates,
//! cancellation and deletion

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::check;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    order_total, Order, OrderLine, OrderStatus, Payment, PaymentStatus, PricedItem, StockShortage,
};
use crate::store::{with_deadline, Store};
use shared::validation::validate_order_lines;

/// Order service
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

/// Input for placing an order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub reseller_id: Uuid,
    pub items: Vec<OrderLine>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Patch for an existing order. Items are fixed once the order exists.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateOrderInput {
    pub status: Option<OrderStatus>,
    pub reseller_id: Option<Uuid>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            timeout: config.ledger.transaction_timeout(),
        }
    }

    /// Place an order, reserving stock and opening its payment.
    ///
    /// Reservation, order, items and payment commit together or not at all.
    pub async fn create_order(&self, input: CreateOrderInput) -> AppResult<Order> {
        input.validate()?;
        check("items", validate_order_lines(&input.items))?;
        with_deadline(self.timeout, self.place(input)).await
    }

    async fn place(&self, input: CreateOrderInput) -> AppResult<Order> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        if tx.find_reseller(input.reseller_id).await?.is_none() {
            return Err(AppError::NotFound("Reseller".to_string()));
        }

        // Rows are locked in product id order so concurrent orders cannot deadlock
        let mut lock_order: Vec<usize> = (0..input.items.len()).collect();
        lock_order.sort_by_key(|&index| input.items[index].product_id);

        let mut priced: Vec<Option<PricedItem>> = vec![None; input.items.len()];
        for index in lock_order {
            let line = &input.items[index];
            let product = tx
                .lock_product(line.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
            product.check_reservation(line.quantity)?;

            // Another order may have drained the stock since the read
            if tx.adjust_stock(product.id, -line.quantity).await?.is_none() {
                let available = tx
                    .find_product(product.id)
                    .await?
                    .map_or(0, |p| p.current_stock);
                return Err(StockShortage {
                    product_id: product.id,
                    product_name: product.name,
                    available,
                    requested: line.quantity,
                }
                .into());
            }
            priced[index] = Some(PricedItem::new(product.id, line.quantity, product.price));
        }
        let priced: Vec<PricedItem> = priced.into_iter().flatten().collect();

        let order_id = Uuid::new_v4();
        let total_amount = order_total(&priced);
        let order = Order {
            id: order_id,
            reseller_id: input.reseller_id,
            order_items: priced
                .into_iter()
                .map(|item| item.into_item(order_id, now))
                .collect(),
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            order_date: now,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        tx.insert_order(&order).await?;

        let payment = Payment::open(order.id, total_amount, now);
        tx.insert_payment(&payment).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            reseller_id = %order.reseller_id,
            items = order.order_items.len(),
            total = %order.total_amount,
            "Order created"
        );
        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> AppResult<Order> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.find_order(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Order".to_string()))
        })
        .await
    }

    /// All live orders, newest first
    pub async fn list_orders(&self) -> AppResult<Vec<Order>> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.list_orders().await
        })
        .await
    }

    /// Patch status, notes or reseller. Status only moves forward.
    pub async fn update_order(&self, id: Uuid, input: UpdateOrderInput) -> AppResult<Order> {
        input.validate()?;
        if input.status == Some(OrderStatus::Cancelled) {
            return Err(AppError::InvalidStateTransition(
                "orders are cancelled through the cancel operation".to_string(),
            ));
        }
        with_deadline(self.timeout, self.patch(id, input)).await
    }

    async fn patch(&self, id: Uuid, input: UpdateOrderInput) -> AppResult<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_order(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if let Some(status) = input.status {
            if !order.status.can_transition_to(status) {
                return Err(AppError::InvalidStateTransition(format!(
                    "{} -> {}",
                    order.status, status
                )));
            }
            order.status = status;
        }

        if let Some(reseller_id) = input.reseller_id {
            if tx.find_reseller(reseller_id).await?.is_none() {
                return Err(AppError::NotFound("Reseller".to_string()));
            }
            order.reseller_id = reseller_id;
        }

        if let Some(notes) = input.notes {
            order.notes = Some(notes);
        }

        order.updated_at = Utc::now();
        tx.update_order(&order).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, status = %order.status, "Order updated");
        Ok(order)
    }

    /// Soft-delete an order and its items. Stock is not restored.
    pub async fn delete_order(&self, id: Uuid) -> AppResult<()> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            if !tx.soft_delete_order(id, Utc::now()).await? {
                return Err(AppError::NotFound("Order".to_string()));
            }
            tx.commit().await?;
            tracing::info!(order_id = %id, "Order deleted");
            Ok(())
        })
        .await
    }

    /// Cancel an order, returning its stock and closing its payment.
    ///
    /// Ledger entries already recorded for the order stay as they are.
    pub async fn cancel_order(&self, id: Uuid) -> AppResult<Order> {
        with_deadline(self.timeout, self.cancel(id)).await
    }

    async fn cancel(&self, id: Uuid) -> AppResult<Order> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_order(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if order.is_cancelled() {
            return Err(AppError::AlreadyCancelled("Order".to_string()));
        }

        let mut restock: Vec<_> = order.order_items.iter().collect();
        restock.sort_by_key(|item| item.product_id);
        for item in restock {
            if tx.adjust_stock(item.product_id, item.quantity).await?.is_none() {
                return Err(AppError::NotFound("Product".to_string()));
            }
        }

        match tx.lock_payment_by_order(id).await? {
            Some(mut payment) => {
                payment.status = PaymentStatus::Cancelled;
                payment.updated_at = now;
                tx.update_payment(&payment).await?;
            }
            None => tracing::warn!(order_id = %id, "Cancelling order without payment record"),
        }

        order.status = OrderStatus::Cancelled;
        order.payment_status = PaymentStatus::Cancelled;
        order.updated_at = now;
        tx.update_order(&order).await?;

        tx.commit().await?;

        tracing::info!(order_id = %order.id, items = order.order_items.len(), "Order cancelled");
        Ok(order)
    }
}

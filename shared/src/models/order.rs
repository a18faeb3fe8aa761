//! Order and order item models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PaymentStatus;
use crate::types::ParseEnumError;

/// Fulfilment status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Completed => "completed",
        }
    }

    /// Statuses only move forward. Cancellation has its own operation and is terminal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Confirmed)
                | (Pending, Completed)
                | (Confirmed, Confirmed)
                | (Confirmed, Completed)
                | (Completed, Completed)
        )
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(ParseEnumError::new("order status", other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order placed by a reseller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub order_items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub order_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    /// Orders still waiting for money
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self.payment_status,
            PaymentStatus::Unpaid | PaymentStatus::PartiallyPaid
        )
    }
}

/// A line of an order with the unit price captured when the order was placed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price snapshot, independent of later catalog price changes
    pub price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Requested product and quantity, as submitted by the client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// An order line after the unit price has been snapshotted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

impl PricedItem {
    pub fn new(product_id: Uuid, quantity: i32, price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            price,
            subtotal: price * Decimal::from(quantity),
        }
    }

    /// Materialize the item for a persisted order
    pub fn into_item(self, order_id: Uuid, created_at: DateTime<Utc>) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            price: self.price,
            subtotal: self.subtotal,
            created_at,
        }
    }
}

/// Sum of the item subtotals
pub fn order_total(items: &[PricedItem]) -> Decimal {
    items.iter().map(|item| item.subtotal).sum()
}

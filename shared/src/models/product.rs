//! Product catalog and stock models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::RecordStatus;

/// Default low-stock threshold for new products
pub const DEFAULT_MIN_STOCK_ALERT: i32 = 10;

/// A catalog product with its current stock counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Stock keeping unit, unique across the catalog
    pub sku: String,
    pub price: Decimal,
    pub current_stock: i32,
    /// Alert when stock falls to or below this value
    pub min_stock_alert: i32,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Requested quantity is larger than the available stock
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient stock for product {product_name}: available {available}, requested {requested}")]
pub struct StockShortage {
    pub product_id: Uuid,
    pub product_name: String,
    pub available: i32,
    pub requested: i32,
}

impl Product {
    /// Active products at or below their alert threshold are low on stock
    pub fn is_low_stock(&self) -> bool {
        self.status == RecordStatus::Active && self.current_stock <= self.min_stock_alert
    }

    /// Check that `quantity` units can be reserved from the current stock
    pub fn check_reservation(&self, quantity: i32) -> Result<(), StockShortage> {
        if quantity > self.current_stock {
            return Err(StockShortage {
                product_id: self.id,
                product_name: self.name.clone(),
                available: self.current_stock,
                requested: quantity,
            });
        }
        Ok(())
    }
}

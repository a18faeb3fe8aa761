//! Product catalog and stock replenishment

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::check;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Product, RecordStatus, DEFAULT_MIN_STOCK_ALERT};
use crate::store::{with_deadline, Store};
use shared::validation::{validate_price, validate_quantity, validate_sku, validate_stock_level};

/// Product service
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub sku: String,
    pub price: Decimal,
    #[serde(default)]
    pub current_stock: i32,
    pub min_stock_alert: Option<i32>,
}

/// Input for updating catalog fields. Stock moves through orders and restocks.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub min_stock_alert: Option<i32>,
    pub status: Option<RecordStatus>,
}

/// Input for adding stock
#[derive(Debug, Deserialize)]
pub struct RestockInput {
    pub quantity: i32,
}

impl ProductService {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            timeout: config.ledger.transaction_timeout(),
        }
    }

    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;
        check("sku", validate_sku(&input.sku))?;
        check("price", validate_price(input.price))?;
        check("current_stock", validate_stock_level(input.current_stock))?;
        let min_stock_alert = input.min_stock_alert.unwrap_or(DEFAULT_MIN_STOCK_ALERT);
        check("min_stock_alert", validate_stock_level(min_stock_alert))?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            sku: input.sku,
            price: input.price,
            current_stock: input.current_stock,
            min_stock_alert,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };

        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.insert_product(&product).await?;
            tx.commit().await?;
            Ok(())
        })
        .await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.find_product(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Product".to_string()))
        })
        .await
    }

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.list_products().await
        })
        .await
    }

    /// Active products at or below their alert threshold, lowest stock first
    pub async fn list_low_stock(&self) -> AppResult<Vec<Product>> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.list_low_stock_products().await
        })
        .await
    }

    pub async fn update_product(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        input.validate()?;
        if let Some(sku) = &input.sku {
            check("sku", validate_sku(sku))?;
        }
        if let Some(price) = input.price {
            check("price", validate_price(price))?;
        }
        if let Some(alert) = input.min_stock_alert {
            check("min_stock_alert", validate_stock_level(alert))?;
        }

        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let mut product = tx
                .lock_product(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

            if let Some(name) = input.name {
                product.name = name;
            }
            if input.description.is_some() {
                product.description = input.description;
            }
            if let Some(sku) = input.sku {
                product.sku = sku;
            }
            if let Some(price) = input.price {
                product.price = price;
            }
            if let Some(alert) = input.min_stock_alert {
                product.min_stock_alert = alert;
            }
            if let Some(status) = input.status {
                product.status = status;
            }
            product.updated_at = Utc::now();

            tx.update_product(&product).await?;
            tx.commit().await?;
            tracing::info!(product_id = %product.id, "Product updated");
            Ok(product)
        })
        .await
    }

    /// Add stock to a product
    pub async fn restock(&self, id: Uuid, input: RestockInput) -> AppResult<Product> {
        check("quantity", validate_quantity(input.quantity))?;

        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let stock = tx
                .adjust_stock(id, input.quantity)
                .await?
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
            let product = tx
                .find_product(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
            tx.commit().await?;

            tracing::info!(product_id = %id, quantity = input.quantity, stock, "Product restocked");
            Ok(product)
        })
        .await
    }

    /// Soft-delete a product that no order refers to
    pub async fn delete_product(&self, id: Uuid) -> AppResult<()> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            if tx.count_order_items_for_product(id).await? > 0 {
                return Err(AppError::InUse("Product".to_string()));
            }
            if !tx.soft_delete_product(id, Utc::now()).await? {
                return Err(AppError::NotFound("Product".to_string()));
            }
            tx.commit().await?;
            tracing::info!(product_id = %id, "Product deleted");
            Ok(())
        })
        .await
    }
}

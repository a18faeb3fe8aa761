//! Reseller master data

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::check;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{RecordStatus, Reseller, ResellerWithOrders};
use crate::store::{with_deadline, Store};
use shared::validation::validate_phone;

/// Reseller service
#[derive(Clone)]
pub struct ResellerService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

/// Input for creating a reseller
#[derive(Debug, Deserialize, Validate)]
pub struct CreateResellerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
}

/// Input for updating a reseller
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateResellerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
    pub status: Option<RecordStatus>,
}

impl ResellerService {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            timeout: config.ledger.transaction_timeout(),
        }
    }

    pub async fn create_reseller(&self, input: CreateResellerInput) -> AppResult<Reseller> {
        input.validate()?;
        if let Some(phone) = &input.phone {
            check("phone", validate_phone(phone))?;
        }

        let now = Utc::now();
        let reseller = Reseller {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email,
            phone: input.phone,
            address: input.address,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };

        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.insert_reseller(&reseller).await?;
            tx.commit().await?;
            Ok(())
        })
        .await?;

        tracing::info!(reseller_id = %reseller.id, "Reseller created");
        Ok(reseller)
    }

    pub async fn get_reseller(&self, id: Uuid) -> AppResult<Reseller> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.find_reseller(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Reseller".to_string()))
        })
        .await
    }

    pub async fn list_resellers(&self) -> AppResult<Vec<Reseller>> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.list_resellers().await
        })
        .await
    }

    /// A reseller together with its orders, newest first
    pub async fn get_reseller_with_orders(&self, id: Uuid) -> AppResult<ResellerWithOrders> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let reseller = tx
                .find_reseller(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Reseller".to_string()))?;
            let orders = tx.list_orders_by_reseller(id).await?;
            Ok(ResellerWithOrders { reseller, orders })
        })
        .await
    }

    pub async fn update_reseller(
        &self,
        id: Uuid,
        input: UpdateResellerInput,
    ) -> AppResult<Reseller> {
        input.validate()?;
        if let Some(phone) = &input.phone {
            check("phone", validate_phone(phone))?;
        }

        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let mut reseller = tx
                .find_reseller(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Reseller".to_string()))?;

            if let Some(name) = input.name {
                reseller.name = name;
            }
            if let Some(email) = input.email {
                reseller.email = email;
            }
            if input.phone.is_some() {
                reseller.phone = input.phone;
            }
            if input.address.is_some() {
                reseller.address = input.address;
            }
            if let Some(status) = input.status {
                reseller.status = status;
            }
            reseller.updated_at = Utc::now();

            tx.update_reseller(&reseller).await?;
            tx.commit().await?;
            tracing::info!(reseller_id = %reseller.id, "Reseller updated");
            Ok(reseller)
        })
        .await
    }

    pub async fn delete_reseller(&self, id: Uuid) -> AppResult<()> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            if !tx.soft_delete_reseller(id, Utc::now()).await? {
                return Err(AppError::NotFound("Reseller".to_string()));
            }
            tx.commit().await?;
            tracing::info!(reseller_id = %id, "Reseller deleted");
            Ok(())
        })
        .await
    }
}

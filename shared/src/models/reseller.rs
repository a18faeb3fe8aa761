//! Reseller models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Order;
use crate::types::RecordStatus;

/// A reseller placing orders against the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reseller {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reseller together with the orders it placed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResellerWithOrders {
    #[serde(flatten)]
    pub reseller: Reseller,
    pub orders: Vec<Order>,
}

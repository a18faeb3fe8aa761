//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use reseller_ledger_backend::config::Config;
use reseller_ledger_backend::models::{OrderLine, Product, Reseller};
use reseller_ledger_backend::services::product::CreateProductInput;
use reseller_ledger_backend::services::reseller::CreateResellerInput;
use reseller_ledger_backend::services::{
    BalanceService, DashboardService, LedgerService, OrderService, ProductService,
    ResellerService,
};
use reseller_ledger_backend::store::{MemoryStore, Store};

pub const JWT_SECRET: &str = "integration-test-secret";

// Helper to create Decimal from string
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn line(product_id: Uuid, quantity: i32) -> OrderLine {
    OrderLine {
        product_id,
        quantity,
    }
}

/// Services wired to one in-memory store
pub struct Harness {
    pub store: MemoryStore,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store,
            config: Config::in_memory(JWT_SECRET),
        }
    }

    pub fn shared(&self) -> Arc<dyn Store> {
        Arc::new(self.store.clone())
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.shared(), &self.config)
    }

    pub fn ledger(&self) -> LedgerService {
        LedgerService::new(self.shared(), &self.config)
    }

    pub fn balance(&self) -> BalanceService {
        BalanceService::new(self.shared(), &self.config)
    }

    pub fn products(&self) -> ProductService {
        ProductService::new(self.shared(), &self.config)
    }

    pub fn resellers(&self) -> ResellerService {
        ResellerService::new(self.shared(), &self.config)
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.shared(), &self.config)
    }

    pub async fn reseller(&self) -> Reseller {
        let n = Uuid::new_v4().simple().to_string();
        self.resellers()
            .create_reseller(CreateResellerInput {
                name: format!("Reseller {}", &n[..6]),
                email: format!("reseller-{}@example.com", &n[..12]),
                phone: Some("081234567890".to_string()),
                address: None,
            })
            .await
            .unwrap()
    }

    pub async fn product(&self, price: &str, stock: i32) -> Product {
        let n = Uuid::new_v4().simple().to_string().to_uppercase();
        self.products()
            .create_product(CreateProductInput {
                name: format!("Product {}", &n[..6]),
                description: None,
                sku: format!("SKU-{}", &n[..8]),
                price: dec(price),
                current_stock: stock,
                min_stock_alert: Some(2),
            })
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        self.products()
            .get_product(product_id)
            .await
            .unwrap()
            .current_stock
    }
}

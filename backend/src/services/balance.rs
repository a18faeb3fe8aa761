//! Balance management and ledger reconciliation

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::check;
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{Balance, ReconciliationReport};
use crate::store::{with_deadline, Store};
use shared::validation::validate_initial_balance;

/// Balance service
#[derive(Clone)]
pub struct BalanceService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

/// Input for setting the opening balance
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBalanceInput {
    pub initial_balance: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl BalanceService {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            timeout: config.ledger.transaction_timeout(),
        }
    }

    /// Create the balance record if it does not exist yet
    pub async fn initialize(&self) -> AppResult<Balance> {
        let balance = self.get_balance().await?;
        tracing::info!(
            current = %balance.current_balance,
            version = balance.version,
            "Balance initialized"
        );
        Ok(balance)
    }

    pub async fn get_balance(&self) -> AppResult<Balance> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let balance = tx.ensure_balance(Utc::now()).await?;
            tx.commit().await?;
            Ok(balance)
        })
        .await
    }

    /// Set the opening balance, shifting the current balance by the same delta
    pub async fn update_initial_balance(&self, input: UpdateBalanceInput) -> AppResult<Balance> {
        input.validate()?;
        check(
            "initial_balance",
            validate_initial_balance(input.initial_balance),
        )?;

        with_deadline(self.timeout, async {
            let now = Utc::now();
            let mut tx = self.store.begin().await?;
            let mut balance = tx.lock_balance(now).await?;
            let previous = balance.initial_balance;
            balance.rebase(input.initial_balance, input.notes, now);
            let balance = tx.save_balance(&balance).await?;
            tx.commit().await?;

            tracing::info!(
                previous = %previous,
                initial = %balance.initial_balance,
                current = %balance.current_balance,
                "Initial balance updated"
            );
            Ok(balance)
        })
        .await
    }

    /// Recompute the balance from the full ledger and repair any drift
    pub async fn reconcile(&self) -> AppResult<ReconciliationReport> {
        with_deadline(self.timeout, async {
            let now = Utc::now();
            let mut tx = self.store.begin().await?;
            let mut balance = tx.lock_balance(now).await?;
            let totals = tx.ledger_totals().await?;

            let mut report = ReconciliationReport::new(&balance, &totals);
            if !report.is_consistent() {
                tracing::warn!(
                    stored = %report.stored_balance,
                    recomputed = %report.recomputed_balance,
                    drift = %report.drift,
                    "Balance drift detected, repairing"
                );
                balance.current_balance = report.recomputed_balance;
                balance.updated_at = now;
                tx.save_balance(&balance).await?;
                report.repaired = true;
            }
            tx.commit().await?;

            Ok(report)
        })
        .await
    }
}

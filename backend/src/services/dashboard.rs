//! Read-only dashboard rollup

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{DashboardData, TimeWindow};
use crate::store::{with_deadline, Store};

/// Dashboard service
#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn Store>,
    timeout: Duration,
    recent_limit: i64,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            timeout: config.ledger.transaction_timeout(),
            recent_limit: config.ledger.recent_transactions_limit,
        }
    }

    pub async fn get_dashboard(&self) -> AppResult<DashboardData> {
        self.dashboard_at(Utc::now()).await
    }

    /// Dashboard with today and this month taken relative to `now` (UTC)
    pub async fn dashboard_at(&self, now: DateTime<Utc>) -> AppResult<DashboardData> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;

            let balance = tx.ensure_balance(now).await?;
            let today = tx.window_totals(&TimeWindow::day_of(now)).await?;
            let month = tx.window_totals(&TimeWindow::month_of(now)).await?;
            let all_time = tx.ledger_totals().await?;

            Ok(DashboardData {
                current_balance: balance.current_balance,
                today_cash_in: today.cash_in,
                this_month_cash_in: month.cash_in,
                all_time_cash_in: all_time.cash_in,
                today_cash_out: today.cash_out,
                this_month_cash_out: month.cash_out,
                all_time_cash_out: all_time.cash_out,
                recent_transactions: tx.list_transactions(Some(self.recent_limit)).await?,
                low_stock_alerts: tx.list_low_stock_products().await?,
                unpaid_orders: tx.list_outstanding_orders().await?,
            })
        })
        .await
    }
}

//! Dashboard rollup models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Order, Product, Transaction};

/// Read-only overview of cash flow, stock alerts and receivables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub current_balance: Decimal,
    pub today_cash_in: Decimal,
    pub this_month_cash_in: Decimal,
    pub all_time_cash_in: Decimal,
    pub today_cash_out: Decimal,
    pub this_month_cash_out: Decimal,
    pub all_time_cash_out: Decimal,
    pub recent_transactions: Vec<Transaction>,
    pub low_stock_alerts: Vec<Product>,
    pub unpaid_orders: Vec<Order>,
}

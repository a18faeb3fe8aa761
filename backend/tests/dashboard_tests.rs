//! Dashboard aggregation tests

mod common;

use chrono::{Duration, Utc};
use common::{dec, line, Harness};
use reseller_ledger_backend::models::{PaymentStatus, TransactionCategory};
use reseller_ledger_backend::services::ledger::{CashInInput, CashOutInput, RecordPaymentInput};
use reseller_ledger_backend::services::order::CreateOrderInput;
use reseller_ledger_backend::services::product::RestockInput;
use rust_decimal::Decimal;

async fn cash_in(h: &Harness, amount: &str) {
    h.ledger()
        .record_cash_in(CashInInput {
            amount: dec(amount),
            description: None,
            reference_id: None,
            category: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_empty_dashboard() {
    let h = Harness::new();
    let data = h.dashboard().get_dashboard().await.unwrap();

    assert_eq!(data.current_balance, Decimal::ZERO);
    assert_eq!(data.all_time_cash_in, Decimal::ZERO);
    assert!(data.recent_transactions.is_empty());
    assert!(data.low_stock_alerts.is_empty());
    assert!(data.unpaid_orders.is_empty());
}

#[tokio::test]
async fn test_aggregates_and_alerts() {
    let h = Harness::new();
    let reseller = h.reseller().await;
    let serum = h.product("10.00", 5).await;
    let toner = h.product("4.00", 50).await;

    // Leaves the serum at 2, on its alert threshold
    let paid = h
        .orders()
        .create_order(CreateOrderInput {
            reseller_id: reseller.id,
            items: vec![line(serum.id, 3)],
            notes: None,
        })
        .await
        .unwrap();
    let unpaid = h
        .orders()
        .create_order(CreateOrderInput {
            reseller_id: reseller.id,
            items: vec![line(toner.id, 5)],
            notes: None,
        })
        .await
        .unwrap();
    let cancelled = h
        .orders()
        .create_order(CreateOrderInput {
            reseller_id: reseller.id,
            items: vec![line(toner.id, 1)],
            notes: None,
        })
        .await
        .unwrap();
    h.orders().cancel_order(cancelled.id).await.unwrap();

    h.ledger()
        .record_payment(
            paid.id,
            RecordPaymentInput {
                amount: dec("30.00"),
                notes: None,
            },
        )
        .await
        .unwrap();
    h.ledger()
        .record_payment(
            unpaid.id,
            RecordPaymentInput {
                amount: dec("5.00"),
                notes: None,
            },
        )
        .await
        .unwrap();
    cash_in(&h, "100.00").await;
    h.ledger()
        .record_cash_out(CashOutInput {
            category: TransactionCategory::Rent,
            amount: dec("45.00"),
            description: None,
        })
        .await
        .unwrap();

    let data = h.dashboard().get_dashboard().await.unwrap();

    assert_eq!(data.current_balance, dec("90.00"));
    assert_eq!(data.today_cash_in, dec("135.00"));
    assert_eq!(data.this_month_cash_in, dec("135.00"));
    assert_eq!(data.all_time_cash_in, dec("135.00"));
    assert_eq!(data.today_cash_out, dec("45.00"));
    assert_eq!(data.all_time_cash_out, dec("45.00"));
    assert_eq!(data.recent_transactions.len(), 4);

    let low: Vec<_> = data.low_stock_alerts.iter().map(|p| p.id).collect();
    assert_eq!(low, vec![serum.id]);

    assert_eq!(data.unpaid_orders.len(), 1);
    assert_eq!(data.unpaid_orders[0].id, unpaid.id);
    assert_eq!(
        data.unpaid_orders[0].payment_status,
        PaymentStatus::PartiallyPaid
    );

    // Restocking clears the alert
    h.products()
        .restock(serum.id, RestockInput { quantity: 10 })
        .await
        .unwrap();
    let data = h.dashboard().get_dashboard().await.unwrap();
    assert!(data.low_stock_alerts.is_empty());
}

#[tokio::test]
async fn test_recent_transactions_are_capped() {
    let h = Harness::new();
    for i in 1..=12 {
        cash_in(&h, &format!("{}.00", i)).await;
    }

    let data = h.dashboard().get_dashboard().await.unwrap();
    assert_eq!(data.recent_transactions.len(), 10);
    assert_eq!(data.recent_transactions[0].amount, dec("12.00"));
    assert_eq!(data.all_time_cash_in, dec("78.00"));
}

#[tokio::test]
async fn test_windows_follow_the_clock() {
    let h = Harness::new();
    cash_in(&h, "20.00").await;

    let later = h
        .dashboard()
        .dashboard_at(Utc::now() + Duration::days(40))
        .await
        .unwrap();
    assert_eq!(later.today_cash_in, Decimal::ZERO);
    assert_eq!(later.this_month_cash_in, Decimal::ZERO);
    assert_eq!(later.all_time_cash_in, dec("20.00"));
    assert_eq!(later.current_balance, dec("20.00"));
}

//! Ledger and balance tests
//!
//! Cash movements, the running balance, reconciliation and store deadlines

mod common;

use std::time::Duration;

use chrono::Utc;
use common::{dec, Harness};
use proptest::prelude::*;
use reseller_ledger_backend::error::AppError;
use reseller_ledger_backend::models::{TransactionCategory, TransactionType};
use reseller_ledger_backend::services::balance::UpdateBalanceInput;
use reseller_ledger_backend::services::ledger::{CashInInput, CashOutInput};
use reseller_ledger_backend::store::{MemoryStore, Store};
use rust_decimal::Decimal;

fn cash_in(amount: &str) -> CashInInput {
    CashInInput {
        amount: dec(amount),
        description: None,
        reference_id: None,
        category: None,
    }
}

fn cash_out(amount: &str, category: TransactionCategory) -> CashOutInput {
    CashOutInput {
        category,
        amount: dec(amount),
        description: Some("Office".to_string()),
    }
}

// ============================================================================
// Cash movements
// ============================================================================

#[tokio::test]
async fn test_cash_in_defaults_to_other() {
    let h = Harness::new();
    let entry = h.ledger().record_cash_in(cash_in("100.00")).await.unwrap();

    assert_eq!(entry.transaction.transaction_type, TransactionType::CashIn);
    assert_eq!(entry.transaction.category, TransactionCategory::Other);
    assert_eq!(entry.transaction.payment_id, None);
    assert_eq!(entry.current_balance, dec("100.00"));
}

#[tokio::test]
async fn test_cash_out_reduces_balance() {
    let h = Harness::new();
    h.ledger().record_cash_in(cash_in("100.00")).await.unwrap();

    let entry = h
        .ledger()
        .record_cash_out(cash_out("40.00", TransactionCategory::Rent))
        .await
        .unwrap();
    assert_eq!(entry.transaction.transaction_type, TransactionType::CashOut);
    assert_eq!(entry.transaction.category, TransactionCategory::Rent);
    assert_eq!(entry.current_balance, dec("60.00"));
}

#[tokio::test]
async fn test_cash_out_above_balance_refused() {
    let h = Harness::new();
    h.ledger().record_cash_in(cash_in("50.00")).await.unwrap();

    let err = h
        .ledger()
        .record_cash_out(cash_out("50.01", TransactionCategory::Salary))
        .await
        .unwrap_err();
    match err {
        AppError::InsufficientBalance(funds) => {
            assert_eq!(funds.available, dec("50.00"));
            assert_eq!(funds.requested, dec("50.01"));
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }

    assert_eq!(h.ledger().list_transactions().await.unwrap().len(), 1);
    assert_eq!(
        h.balance().get_balance().await.unwrap().current_balance,
        dec("50.00")
    );

    // Draining to exactly zero is allowed
    let entry = h
        .ledger()
        .record_cash_out(cash_out("50.00", TransactionCategory::Salary))
        .await
        .unwrap();
    assert_eq!(entry.current_balance, Decimal::ZERO);
}

#[tokio::test]
async fn test_non_positive_amounts_rejected() {
    let h = Harness::new();
    assert!(matches!(
        h.ledger().record_cash_in(cash_in("0")).await,
        Err(AppError::Validation { .. })
    ));
    assert!(matches!(
        h.ledger()
            .record_cash_out(cash_out("-1", TransactionCategory::Other))
            .await,
        Err(AppError::Validation { .. })
    ));
    assert!(h.ledger().list_transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sub_cent_amounts_rejected() {
    let h = Harness::new();
    h.ledger().record_cash_in(cash_in("10.00")).await.unwrap();

    let err = h.ledger().record_cash_in(cash_in("0.001")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "amount"));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

    assert!(matches!(
        h.ledger()
            .record_cash_out(cash_out("1.005", TransactionCategory::Other))
            .await,
        Err(AppError::Validation { .. })
    ));
    assert!(matches!(
        h.balance()
            .update_initial_balance(UpdateBalanceInput {
                initial_balance: dec("100.001"),
                notes: None,
            })
            .await,
        Err(AppError::Validation { .. })
    ));

    assert_eq!(h.ledger().list_transactions().await.unwrap().len(), 1);
    assert_eq!(
        h.balance().get_balance().await.unwrap().current_balance,
        dec("10.00")
    );
}

#[tokio::test]
async fn test_transactions_listed_newest_first() {
    let h = Harness::new();
    for amount in ["1.00", "2.00", "3.00"] {
        h.ledger().record_cash_in(cash_in(amount)).await.unwrap();
    }

    let amounts: Vec<Decimal> = h
        .ledger()
        .list_transactions()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.amount)
        .collect();
    assert_eq!(amounts, vec![dec("3.00"), dec("2.00"), dec("1.00")]);
}

#[tokio::test]
async fn test_csv_export() {
    let h = Harness::new();
    h.ledger().record_cash_in(cash_in("80.00")).await.unwrap();
    h.ledger()
        .record_cash_out(cash_out("12.50", TransactionCategory::Equipment))
        .await
        .unwrap();

    let csv = h.ledger().export_transactions().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,type,category,amount"));
    assert!(lines[1].contains("CASH_OUT,EQUIPMENT,12.50"));
    assert!(lines[2].contains("CASH_IN,OTHER,80.00"));
}

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn test_balance_starts_at_zero() {
    let h = Harness::new();
    let balance = h.balance().initialize().await.unwrap();
    assert_eq!(balance.initial_balance, Decimal::ZERO);
    assert_eq!(balance.current_balance, Decimal::ZERO);

    // Initializing again keeps the existing record
    h.ledger().record_cash_in(cash_in("5.00")).await.unwrap();
    let again = h.balance().initialize().await.unwrap();
    assert_eq!(again.current_balance, dec("5.00"));
}

#[tokio::test]
async fn test_rebase_shifts_current_balance() {
    let h = Harness::new();
    h.ledger().record_cash_in(cash_in("30.00")).await.unwrap();

    let balance = h
        .balance()
        .update_initial_balance(UpdateBalanceInput {
            initial_balance: dec("100.00"),
            notes: Some("Opening cash".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(balance.initial_balance, dec("100.00"));
    assert_eq!(balance.current_balance, dec("130.00"));
    assert_eq!(balance.notes.as_deref(), Some("Opening cash"));

    let balance = h
        .balance()
        .update_initial_balance(UpdateBalanceInput {
            initial_balance: dec("40.00"),
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(balance.current_balance, dec("70.00"));
    assert_eq!(balance.notes.as_deref(), Some("Opening cash"));

    assert!(matches!(
        h.balance()
            .update_initial_balance(UpdateBalanceInput {
                initial_balance: dec("-1.00"),
                notes: None,
            })
            .await,
        Err(AppError::Validation { .. })
    ));
    assert!(h.balance().reconcile().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_reconcile_consistent_ledger() {
    let h = Harness::new();
    h.ledger().record_cash_in(cash_in("70.00")).await.unwrap();
    h.ledger()
        .record_cash_out(cash_out("20.00", TransactionCategory::Rent))
        .await
        .unwrap();

    let report = h.balance().reconcile().await.unwrap();
    assert!(report.is_consistent());
    assert!(!report.repaired);
    assert_eq!(report.total_cash_in, dec("70.00"));
    assert_eq!(report.total_cash_out, dec("20.00"));
    assert_eq!(report.recomputed_balance, dec("50.00"));
}

#[tokio::test]
async fn test_reconcile_repairs_drift() {
    let h = Harness::new();
    h.ledger().record_cash_in(cash_in("70.00")).await.unwrap();

    // Corrupt the stored balance behind the ledger's back
    {
        let mut tx = h.store.begin().await.unwrap();
        let mut balance = tx.lock_balance(Utc::now()).await.unwrap();
        balance.current_balance = dec("999.00");
        tx.save_balance(&balance).await.unwrap();
        tx.commit().await.unwrap();
    }

    let report = h.balance().reconcile().await.unwrap();
    assert!(report.repaired);
    assert_eq!(report.stored_balance, dec("999.00"));
    assert_eq!(report.recomputed_balance, dec("70.00"));
    assert_eq!(report.drift, dec("929.00"));

    assert_eq!(
        h.balance().get_balance().await.unwrap().current_balance,
        dec("70.00")
    );
    assert!(!h.balance().reconcile().await.unwrap().repaired);
}

// ============================================================================
// Deadlines and concurrency
// ============================================================================

#[tokio::test]
async fn test_slow_store_times_out() {
    let base = MemoryStore::new();
    let mut slow = Harness::with_store(base.clone().with_latency(Duration::from_millis(50)));
    slow.config.ledger.transaction_timeout_ms = 10;

    let err = slow.ledger().record_cash_in(cash_in("10.00")).await.unwrap_err();
    assert!(matches!(err, AppError::StoreTimeout));
    assert!(err.is_retryable());

    let fast = Harness::with_store(base);
    assert!(fast.ledger().list_transactions().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cash_in_sums() {
    let h = Harness::new();
    let mut handles = Vec::new();
    for _ in 0..20 {
        let ledger = h.ledger();
        handles.push(tokio::spawn(async move {
            ledger.record_cash_in(cash_in("2.50")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(
        h.balance().get_balance().await.unwrap().current_balance,
        dec("50.00")
    );
    assert_eq!(h.ledger().list_transactions().await.unwrap().len(), 20);
    assert!(h.balance().reconcile().await.unwrap().is_consistent());
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The balance never goes negative and always equals the opening balance
    /// plus the net of the ledger
    #[test]
    fn prop_balance_matches_ledger(
        opening in 0i64..10_000,
        moves in proptest::collection::vec((any::<bool>(), 1i64..5_000), 1..25),
    ) {
        tokio_test::block_on(async {
            let h = Harness::new();
            h.balance()
                .update_initial_balance(UpdateBalanceInput {
                    initial_balance: Decimal::new(opening, 2),
                    notes: None,
                })
                .await
                .unwrap();

            let mut expected = Decimal::new(opening, 2);
            for (incoming, cents) in moves {
                let amount = Decimal::new(cents, 2);
                if incoming {
                    h.ledger()
                        .record_cash_in(CashInInput {
                            amount,
                            description: None,
                            reference_id: None,
                            category: None,
                        })
                        .await
                        .unwrap();
                    expected += amount;
                } else {
                    let result = h
                        .ledger()
                        .record_cash_out(CashOutInput {
                            category: TransactionCategory::Other,
                            amount,
                            description: None,
                        })
                        .await;
                    assert_eq!(result.is_ok(), amount <= expected);
                    if result.is_ok() {
                        expected -= amount;
                    }
                }
                let current = h.balance().get_balance().await.unwrap().current_balance;
                assert!(current >= Decimal::ZERO);
                assert_eq!(current, expected);
            }

            assert!(h.balance().reconcile().await.unwrap().is_consistent());
        });
    }
}

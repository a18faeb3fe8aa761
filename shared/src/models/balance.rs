//! Global cash balance models
//!
//! The balance is a single record keyed by [`BALANCE_KEY`]. Its current value
//! is maintained incrementally as ledger entries are appended; the
//! reconciliation helpers recompute it from the full ledger for audits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TransactionType;

/// Well-known key of the singleton balance record
pub const BALANCE_KEY: &str = "global";

/// The singleton cash balance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Balance {
    pub id: String,
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    pub notes: Option<String>,
    /// Optimistic concurrency counter, bumped on every write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cash-out larger than the money on hand
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient balance: available {available}, requested {requested}")]
pub struct InsufficientFunds {
    pub available: Decimal,
    pub requested: Decimal,
}

impl Balance {
    /// Zero-valued balance created on initialization
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            id: BALANCE_KEY.to_string(),
            initial_balance: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a ledger movement to the running balance.
    ///
    /// A cash-out may never take the balance below zero; the balance is left
    /// untouched when it would.
    pub fn apply(
        &mut self,
        transaction_type: TransactionType,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), InsufficientFunds> {
        match transaction_type {
            TransactionType::CashIn => self.current_balance += amount,
            TransactionType::CashOut => {
                if amount > self.current_balance {
                    return Err(InsufficientFunds {
                        available: self.current_balance,
                        requested: amount,
                    });
                }
                self.current_balance -= amount;
            }
        }
        self.updated_at = now;
        Ok(())
    }

    /// Replace the opening balance, shifting the current balance by the same delta
    pub fn rebase(&mut self, initial_balance: Decimal, notes: Option<String>, now: DateTime<Utc>) {
        let delta = initial_balance - self.initial_balance;
        self.initial_balance = initial_balance;
        self.current_balance += delta;
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = now;
    }
}

/// Sums of all ledger movements by direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LedgerTotals {
    pub cash_in: Decimal,
    pub cash_out: Decimal,
}

impl LedgerTotals {
    pub fn add(&mut self, transaction_type: TransactionType, amount: Decimal) {
        match transaction_type {
            TransactionType::CashIn => self.cash_in += amount,
            TransactionType::CashOut => self.cash_out += amount,
        }
    }

    pub fn net(&self) -> Decimal {
        self.cash_in - self.cash_out
    }
}

/// Recompute the balance from the opening value and the ledger history
pub fn reconcile_balance(initial_balance: Decimal, totals: &LedgerTotals) -> Decimal {
    initial_balance + totals.net()
}

/// Result of an audit comparing the stored balance with the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub initial_balance: Decimal,
    pub stored_balance: Decimal,
    pub recomputed_balance: Decimal,
    pub total_cash_in: Decimal,
    pub total_cash_out: Decimal,
    /// `stored - recomputed`; zero when the ledger and balance agree
    pub drift: Decimal,
    pub repaired: bool,
}

impl ReconciliationReport {
    pub fn new(balance: &Balance, totals: &LedgerTotals) -> Self {
        let recomputed = reconcile_balance(balance.initial_balance, totals);
        let drift = balance.current_balance - recomputed;
        Self {
            initial_balance: balance.initial_balance,
            stored_balance: balance.current_balance,
            recomputed_balance: recomputed,
            total_cash_in: totals.cash_in,
            total_cash_out: totals.cash_out,
            drift,
            repaired: false,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cash_out_beyond_balance_is_refused() {
        let mut balance = Balance::zero(Utc::now());
        balance.apply(TransactionType::CashIn, dec!(100), Utc::now()).unwrap();
        let err = balance
            .apply(TransactionType::CashOut, dec!(100.01), Utc::now())
            .unwrap_err();
        assert_eq!(err.available, dec!(100));
        assert_eq!(balance.current_balance, dec!(100));
    }

    #[test]
    fn test_rebase_shifts_current_by_delta() {
        let mut balance = Balance::zero(Utc::now());
        balance.apply(TransactionType::CashIn, dec!(250), Utc::now()).unwrap();
        balance.rebase(dec!(1000), Some("opening cash".into()), Utc::now());
        assert_eq!(balance.current_balance, dec!(1250));

        balance.rebase(dec!(400), None, Utc::now());
        assert_eq!(balance.initial_balance, dec!(400));
        assert_eq!(balance.current_balance, dec!(650));
        assert_eq!(balance.notes.as_deref(), Some("opening cash"));
    }

    #[test]
    fn test_report_detects_drift() {
        let mut balance = Balance::zero(Utc::now());
        balance.current_balance = dec!(90);
        let totals = LedgerTotals {
            cash_in: dec!(100),
            cash_out: dec!(20),
        };
        let report = ReconciliationReport::new(&balance, &totals);
        assert_eq!(report.recomputed_balance, dec!(80));
        assert_eq!(report.drift, dec!(10));
        assert!(!report.is_consistent());
    }

    proptest! {
        /// Incremental application always agrees with full recomputation
        #[test]
        fn prop_incremental_matches_recomputed(
            initial in 0i64..100_000,
            moves in proptest::collection::vec((any::<bool>(), 1i64..10_000), 0..50),
        ) {
            let now = Utc::now();
            let mut balance = Balance::zero(now);
            balance.rebase(Decimal::from(initial), None, now);
            let mut totals = LedgerTotals::default();

            for (incoming, cents) in moves {
                let amount = Decimal::new(cents, 2);
                let kind = if incoming { TransactionType::CashIn } else { TransactionType::CashOut };
                if balance.apply(kind, amount, now).is_ok() {
                    totals.add(kind, amount);
                }
                prop_assert!(balance.current_balance >= Decimal::ZERO);
            }

            prop_assert_eq!(
                balance.current_balance,
                reconcile_balance(balance.initial_balance, &totals)
            );
        }
    }
}

//! Payment ledger: order payments, cash movements and the transaction log

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{check, post_entry};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    NewTransaction, Payment, Transaction, TransactionCategory, TransactionType,
};
use crate::store::{with_deadline, Store};
use shared::validation::validate_amount;

/// Ledger service
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

/// Input for paying (part of) an order
#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentInput {
    pub amount: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Input for money received outside of order payments
#[derive(Debug, Deserialize, Validate)]
pub struct CashInInput {
    pub amount: Decimal,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub reference_id: Option<Uuid>,
    pub category: Option<TransactionCategory>,
}

/// Input for money leaving the business
#[derive(Debug, Deserialize, Validate)]
pub struct CashOutInput {
    #[serde(default)]
    pub category: TransactionCategory,
    pub amount: Decimal,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Outcome of a recorded payment
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub transaction: Transaction,
    pub current_balance: Decimal,
}

/// Outcome of a cash movement
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub transaction: Transaction,
    pub current_balance: Decimal,
}

impl LedgerService {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            timeout: config.ledger.transaction_timeout(),
        }
    }

    /// Apply a payment to an order and book it as cash in.
    ///
    /// Payment, order status, ledger entry and balance commit together.
    pub async fn record_payment(
        &self,
        order_id: Uuid,
        input: RecordPaymentInput,
    ) -> AppResult<PaymentReceipt> {
        input.validate()?;
        check("amount", validate_amount(input.amount))?;
        with_deadline(self.timeout, self.settle(order_id, input)).await
    }

    async fn settle(&self, order_id: Uuid, input: RecordPaymentInput) -> AppResult<PaymentReceipt> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        if order.is_cancelled() {
            return Err(AppError::AlreadyCancelled("Order".to_string()));
        }

        let mut payment = tx
            .lock_payment_by_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment".to_string()))?;

        let status = payment.settle(input.amount, now)?;
        if input.notes.is_some() {
            payment.notes = input.notes;
        }
        tx.update_payment(&payment).await?;

        order.payment_status = status;
        order.updated_at = now;
        tx.update_order(&order).await?;

        let entry = NewTransaction {
            transaction_type: TransactionType::CashIn,
            category: TransactionCategory::Payment,
            amount: input.amount,
            description: Some(format!("Payment for order {}", order.id)),
            reference_id: Some(order.id),
            payment_id: Some(payment.id),
        };
        let (transaction, balance) = post_entry(tx.as_mut(), entry, now).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            payment_id = %payment.id,
            amount = %input.amount,
            status = %status,
            balance = %balance.current_balance,
            "Payment recorded"
        );

        Ok(PaymentReceipt {
            payment,
            transaction,
            current_balance: balance.current_balance,
        })
    }

    /// Book incoming cash. Category defaults to OTHER.
    pub async fn record_cash_in(&self, input: CashInInput) -> AppResult<LedgerEntry> {
        input.validate()?;
        check("amount", validate_amount(input.amount))?;
        let entry = NewTransaction {
            transaction_type: TransactionType::CashIn,
            category: input.category.unwrap_or_default(),
            amount: input.amount,
            description: input.description,
            reference_id: input.reference_id,
            payment_id: None,
        };
        with_deadline(self.timeout, self.book(entry)).await
    }

    /// Book outgoing cash; refused when the balance does not cover it
    pub async fn record_cash_out(&self, input: CashOutInput) -> AppResult<LedgerEntry> {
        input.validate()?;
        check("amount", validate_amount(input.amount))?;
        let entry = NewTransaction {
            transaction_type: TransactionType::CashOut,
            category: input.category,
            amount: input.amount,
            description: input.description,
            reference_id: None,
            payment_id: None,
        };
        with_deadline(self.timeout, self.book(entry)).await
    }

    async fn book(&self, entry: NewTransaction) -> AppResult<LedgerEntry> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let (transaction, balance) = post_entry(tx.as_mut(), entry, now).await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id,
            kind = transaction.transaction_type.as_str(),
            category = transaction.category.as_str(),
            amount = %transaction.amount,
            balance = %balance.current_balance,
            "Ledger entry recorded"
        );

        Ok(LedgerEntry {
            transaction,
            current_balance: balance.current_balance,
        })
    }

    /// The whole ledger, newest first
    pub async fn list_transactions(&self) -> AppResult<Vec<Transaction>> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.list_transactions(None).await
        })
        .await
    }

    pub async fn list_payments(&self) -> AppResult<Vec<Payment>> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.list_payments().await
        })
        .await
    }

    pub async fn get_payment_by_order(&self, order_id: Uuid) -> AppResult<Payment> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.find_payment_by_order(order_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Payment".to_string()))
        })
        .await
    }

    /// The ledger as CSV, newest first
    pub async fn export_transactions(&self) -> AppResult<String> {
        let transactions = self.list_transactions().await?;
        Self::export_to_csv(&transactions)
    }

    fn export_to_csv(transactions: &[Transaction]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for transaction in transactions {
            wtr.serialize(transaction)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

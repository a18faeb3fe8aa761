//! Payment models and settlement rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::ParseEnumError;

/// Settlement status of an order, mirrored on its payment record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Status implied by the amount paid so far
    pub fn for_amounts(amount_paid: Decimal, total_amount: Decimal) -> Self {
        if amount_paid >= total_amount {
            PaymentStatus::Paid
        } else if amount_paid > Decimal::ZERO {
            PaymentStatus::PartiallyPaid
        } else {
            PaymentStatus::Unpaid
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partially_paid" => Ok(PaymentStatus::PartiallyPaid),
            "paid" => Ok(PaymentStatus::Paid),
            "overdue" => Ok(PaymentStatus::Overdue),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(ParseEnumError::new("payment status", other)),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payment record opened for every order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub status: PaymentStatus,
    /// Time of the most recent payment, if any
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a payment amount was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentRejection {
    #[error("payment amount must be greater than zero")]
    NonPositive,

    #[error("payment amount {amount} exceeds remaining balance {remaining}")]
    ExceedsRemaining { amount: Decimal, remaining: Decimal },
}

impl Payment {
    /// Open an unpaid payment for a freshly created order
    pub fn open(order_id: Uuid, total_amount: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            total_amount,
            amount_paid: Decimal::ZERO,
            status: PaymentStatus::Unpaid,
            payment_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining(&self) -> Decimal {
        self.total_amount - self.amount_paid
    }

    /// Apply an incoming amount, returning the new status.
    ///
    /// Leaves the payment untouched when the amount is refused.
    pub fn settle(
        &mut self,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<PaymentStatus, PaymentRejection> {
        if amount <= Decimal::ZERO {
            return Err(PaymentRejection::NonPositive);
        }
        let remaining = self.remaining();
        if amount > remaining {
            return Err(PaymentRejection::ExceedsRemaining { amount, remaining });
        }

        self.amount_paid += amount;
        self.status = PaymentStatus::for_amounts(self.amount_paid, self.total_amount);
        self.payment_date = Some(now);
        self.updated_at = now;
        Ok(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment(total: Decimal) -> Payment {
        Payment::open(Uuid::new_v4(), total, Utc::now())
    }

    #[test]
    fn test_exact_remaining_marks_paid() {
        let mut p = payment(dec!(35.00));
        assert_eq!(p.settle(dec!(35.00), Utc::now()), Ok(PaymentStatus::Paid));
        assert_eq!(p.remaining(), Decimal::ZERO);
    }

    #[test]
    fn test_partial_then_full() {
        let mut p = payment(dec!(100));
        assert_eq!(
            p.settle(dec!(40), Utc::now()),
            Ok(PaymentStatus::PartiallyPaid)
        );
        assert_eq!(p.settle(dec!(60), Utc::now()), Ok(PaymentStatus::Paid));
        assert_eq!(p.amount_paid, dec!(100));
    }

    #[test]
    fn test_overpayment_leaves_amount_unchanged() {
        let mut p = payment(dec!(50));
        p.settle(dec!(20), Utc::now()).unwrap();
        let err = p.settle(dec!(30.01), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            PaymentRejection::ExceedsRemaining {
                amount: dec!(30.01),
                remaining: dec!(30)
            }
        );
        assert_eq!(p.amount_paid, dec!(20));
        assert_eq!(p.status, PaymentStatus::PartiallyPaid);
    }

    #[test]
    fn test_non_positive_rejected() {
        let mut p = payment(dec!(50));
        assert_eq!(
            p.settle(Decimal::ZERO, Utc::now()),
            Err(PaymentRejection::NonPositive)
        );
        assert_eq!(
            p.settle(dec!(-1), Utc::now()),
            Err(PaymentRejection::NonPositive)
        );
        assert_eq!(p.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_status_for_amounts() {
        assert_eq!(
            PaymentStatus::for_amounts(Decimal::ZERO, dec!(10)),
            PaymentStatus::Unpaid
        );
        assert_eq!(
            PaymentStatus::for_amounts(dec!(10), dec!(10)),
            PaymentStatus::Paid
        );
        assert_eq!(
            "partially_paid".parse::<PaymentStatus>(),
            Ok(PaymentStatus::PartiallyPaid)
        );
    }
}

//! Cash ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ParseEnumError;

/// Direction of a cash movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    CashIn,
    CashOut,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::CashIn => "CASH_IN",
            TransactionType::CashOut => "CASH_OUT",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH_IN" => Ok(TransactionType::CashIn),
            "CASH_OUT" => Ok(TransactionType::CashOut),
            other => Err(ParseEnumError::new("transaction type", other)),
        }
    }
}

/// Ledger category of a cash movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionCategory {
    Rent,
    Salary,
    Equipment,
    /// Money received against an order
    Payment,
    #[default]
    Other,
}

impl TransactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionCategory::Rent => "RENT",
            TransactionCategory::Salary => "SALARY",
            TransactionCategory::Equipment => "EQUIPMENT",
            TransactionCategory::Payment => "PAYMENT",
            TransactionCategory::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for TransactionCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RENT" => Ok(TransactionCategory::Rent),
            "SALARY" => Ok(TransactionCategory::Salary),
            "EQUIPMENT" => Ok(TransactionCategory::Equipment),
            "PAYMENT" => Ok(TransactionCategory::Payment),
            "OTHER" => Ok(TransactionCategory::Other),
            other => Err(ParseEnumError::new("transaction category", other)),
        }
    }
}

/// An append-only ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    /// Order or other entity this movement relates to
    pub reference_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry about to be appended
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
}

impl NewTransaction {
    pub fn into_transaction(self, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            transaction_type: self.transaction_type,
            category: self.category,
            amount: self.amount,
            description: self.description,
            date: now,
            reference_id: self.reference_id,
            payment_id: self.payment_id,
            created_at: now,
        }
    }
}

impl Transaction {
    /// Effect of this entry on the balance
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::CashIn => self.amount,
            TransactionType::CashOut => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&TransactionType::CashOut).unwrap();
        assert_eq!(json, "\"CASH_OUT\"");
    }

    #[test]
    fn test_transaction_field_named_type() {
        let tx = NewTransaction {
            transaction_type: TransactionType::CashIn,
            category: TransactionCategory::Payment,
            amount: dec!(12.50),
            description: None,
            reference_id: None,
            payment_id: None,
        }
        .into_transaction(Utc::now());

        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["type"], "CASH_IN");
        assert_eq!(value["category"], "PAYMENT");
        assert_eq!(tx.signed_amount(), dec!(12.50));
    }

    #[test]
    fn test_unknown_category_rejected() {
        assert!("BONUS".parse::<TransactionCategory>().is_err());
        assert!(serde_json::from_str::<TransactionCategory>("\"BONUS\"").is_err());
        assert_eq!(
            "SALARY".parse::<TransactionCategory>(),
            Ok(TransactionCategory::Salary)
        );
    }
}

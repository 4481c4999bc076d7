//! Billing ledger models
//!
//! Every balance-changing attempt -- successful or not -- is recorded as an
//! immutable `LedgerTransaction`. Rows are never updated after creation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Direction of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Debit,
    Credit,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Debit => write!(f, "DEBIT"),
            TransactionKind::Credit => write!(f, "CREDIT"),
        }
    }
}

impl TransactionKind {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEBIT" => Some(TransactionKind::Debit),
            "CREDIT" => Some(TransactionKind::Credit),
            _ => None,
        }
    }
}

/// Outcome of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// Balance was changed
    Success,
    /// Attempt was rejected; balance untouched
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Success => write!(f, "SUCCESS"),
            TransactionStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl TransactionStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUCCESS" => Some(TransactionStatus::Success),
            "FAILED" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

/// Immutable record of a balance-changing operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique identifier
    pub id: Uuid,

    /// Pass the operation targeted
    pub pass_id: Uuid,

    /// Trip that triggered the debit; `None` for manual recharges
    pub trip_id: Option<Uuid>,

    /// Amount in FCFA, always positive
    pub amount: Decimal,

    /// Debit or credit
    pub kind: TransactionKind,

    /// Success or failed
    pub status: TransactionStatus,

    /// Balance after a successful operation; `None` when failed
    pub balance_after: Option<Decimal>,

    /// Human-readable description
    pub description: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Successful debit record
    pub fn success_debit(
        pass_id: Uuid,
        trip_id: Option<Uuid>,
        amount: Decimal,
        balance_after: Decimal,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pass_id,
            trip_id,
            amount,
            kind: TransactionKind::Debit,
            status: TransactionStatus::Success,
            balance_after: Some(balance_after),
            description,
            created_at: Utc::now(),
        }
    }

    /// Failed debit record, written for audit before the error propagates
    pub fn failed_debit(
        pass_id: Uuid,
        trip_id: Option<Uuid>,
        amount: Decimal,
        reason: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pass_id,
            trip_id,
            amount,
            kind: TransactionKind::Debit,
            status: TransactionStatus::Failed,
            balance_after: None,
            description: format!("FAILED - {}", reason),
            created_at: Utc::now(),
        }
    }

    /// Successful credit (recharge) record
    pub fn success_credit(
        pass_id: Uuid,
        amount: Decimal,
        balance_after: Decimal,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pass_id,
            trip_id: None,
            amount,
            kind: TransactionKind::Credit,
            status: TransactionStatus::Success,
            balance_after: Some(balance_after),
            description,
            created_at: Utc::now(),
        }
    }
}

/// Aggregated ledger figures for one day, for the admin stats endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyLedgerStats {
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub transaction_count: i64,
    pub failed_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_failed_debit_has_no_balance_after() {
        let tx = LedgerTransaction::failed_debit(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            dec!(400),
            "insufficient balance",
        );
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert!(tx.balance_after.is_none());
        assert!(tx.description.starts_with("FAILED - "));
    }

    #[test]
    fn test_success_debit_records_balance_after() {
        let tx = LedgerTransaction::success_debit(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            dec!(400),
            dec!(600),
            "Trip BUS".to_string(),
        );
        assert_eq!(tx.balance_after, Some(dec!(600)));
        assert_eq!(tx.kind, TransactionKind::Debit);
    }

    #[test]
    fn test_credit_has_no_trip() {
        let tx = LedgerTransaction::success_credit(
            Uuid::new_v4(),
            dec!(1000),
            dec!(1500),
            "Recharge".to_string(),
        );
        assert!(tx.trip_id.is_none());
        assert_eq!(tx.kind, TransactionKind::Credit);
    }
}

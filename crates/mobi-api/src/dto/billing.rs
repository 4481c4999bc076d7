//! Billing DTOs

use chrono::{DateTime, Utc};
use mobi_core::models::{DailyLedgerStats, LedgerTransaction, TransactionKind, TransactionStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request body for POST /billing/recharge
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RechargeRequest {
    /// Pass to top up
    pub pass_id: Uuid,

    /// Amount in FCFA, strictly positive
    pub amount: Decimal,

    /// Optional description for the ledger record
    #[validate(length(max = 200))]
    pub description: Option<String>,
}

/// One ledger transaction as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub pass_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub balance_after: Option<Decimal>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerTransaction> for TransactionResponse {
    fn from(tx: LedgerTransaction) -> Self {
        Self {
            id: tx.id,
            pass_id: tx.pass_id,
            trip_id: tx.trip_id,
            amount: tx.amount,
            kind: tx.kind,
            status: tx.status,
            balance_after: tx.balance_after,
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}

/// Result of a recharge
#[derive(Debug, Clone, Serialize)]
pub struct RechargeResponse {
    pub transaction_id: Uuid,
    pub pass_id: Uuid,
    pub amount: Decimal,
    pub balance_after: Decimal,
}

/// Today's successful debit total for one pass
#[derive(Debug, Clone, Serialize)]
pub struct DailyTotalResponse {
    pub pass_id: Uuid,
    pub total: Decimal,
}

/// Today's aggregated ledger figures
#[derive(Debug, Clone, Serialize)]
pub struct DailyStatsResponse {
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub transaction_count: i64,
    pub failed_count: i64,
}

impl From<DailyLedgerStats> for DailyStatsResponse {
    fn from(stats: DailyLedgerStats) -> Self {
        Self {
            total_debits: stats.total_debits,
            total_credits: stats.total_credits,
            transaction_count: stats.transaction_count,
            failed_count: stats.failed_count,
        }
    }
}

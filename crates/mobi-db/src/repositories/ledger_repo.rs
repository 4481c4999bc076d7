//! Ledger transaction repository
//!
//! Append-only: there are no update or delete paths. The transactional debit
//! flow in the billing service appends via `record` on its own connection; the
//! pool-backed methods here serve reads and the out-of-band FAILED audit rows.

use chrono::{DateTime, Utc};
use mobi_core::{
    models::{DailyLedgerStats, LedgerTransaction, TransactionKind, TransactionStatus},
    traits::LedgerRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of LedgerRepository
pub struct PgLedgerRepository {
    pool: PgPool,
}

impl PgLedgerRepository {
    /// Create a new ledger repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    #[instrument(skip(self, tx))]
    async fn record(&self, tx: &LedgerTransaction) -> AppResult<LedgerTransaction> {
        debug!("Recording {} {} for pass {}", tx.status, tx.kind, tx.pass_id);

        let row = sqlx::query_as::<sqlx::Postgres, LedgerRow>(
            r#"
            INSERT INTO ledger_transactions (
                id, pass_id, trip_id, amount, kind, status,
                balance_after, description, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING
                id, pass_id, trip_id, amount, kind, status,
                balance_after, description, created_at
            "#,
        )
        .bind(tx.id)
        .bind(tx.pass_id)
        .bind(tx.trip_id)
        .bind(tx.amount)
        .bind(tx.kind.to_string())
        .bind(tx.status.to_string())
        .bind(tx.balance_after)
        .bind(&tx.description)
        .bind(tx.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error recording ledger transaction: {}", e);
            AppError::Database(format!("Failed to record transaction: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<LedgerTransaction>> {
        debug!("Finding ledger transaction {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, LedgerRow>(
            r#"
            SELECT
                id, pass_id, trip_id, amount, kind, status,
                balance_after, description, created_at
            FROM ledger_transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding transaction {}: {}", id, e);
            AppError::Database(format!("Failed to find transaction: {}", e))
        })?;

        Ok(result.map(LedgerTransaction::from))
    }

    #[instrument(skip(self))]
    async fn history_for_pass(&self, pass_id: Uuid) -> AppResult<Vec<LedgerTransaction>> {
        debug!("Listing ledger history for pass {}", pass_id);

        let rows = sqlx::query_as::<sqlx::Postgres, LedgerRow>(
            r#"
            SELECT
                id, pass_id, trip_id, amount, kind, status,
                balance_after, description, created_at
            FROM ledger_transactions
            WHERE pass_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(pass_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing history for pass {}: {}", pass_id, e);
            AppError::Database(format!("Failed to list transactions: {}", e))
        })?;

        Ok(rows.into_iter().map(LedgerTransaction::from).collect())
    }

    #[instrument(skip(self))]
    async fn sum_success_debits_since(
        &self,
        pass_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Decimal> {
        let total: (Option<Decimal>,) = sqlx::query_as(
            r#"
            SELECT SUM(amount)
            FROM ledger_transactions
            WHERE pass_id = $1
              AND kind = 'DEBIT'
              AND status = 'SUCCESS'
              AND created_at >= $2
            "#,
        )
        .bind(pass_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error summing debits for pass {}: {}", pass_id, e);
            AppError::Database(format!("Failed to sum debits: {}", e))
        })?;

        Ok(total.0.unwrap_or(Decimal::ZERO))
    }

    #[instrument(skip(self))]
    async fn stats_since(&self, since: DateTime<Utc>) -> AppResult<DailyLedgerStats> {
        let row: DailyStatsRow = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (
                    WHERE kind = 'DEBIT' AND status = 'SUCCESS'
                ), 0) AS total_debits,
                COALESCE(SUM(amount) FILTER (
                    WHERE kind = 'CREDIT' AND status = 'SUCCESS'
                ), 0) AS total_credits,
                COUNT(*) AS transaction_count,
                COUNT(*) FILTER (WHERE status = 'FAILED') AS failed_count
            FROM ledger_transactions
            WHERE created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error aggregating ledger stats: {}", e);
            AppError::Database(format!("Failed to aggregate stats: {}", e))
        })?;

        Ok(DailyLedgerStats {
            total_debits: row.total_debits,
            total_credits: row.total_credits,
            transaction_count: row.transaction_count,
            failed_count: row.failed_count,
        })
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    pass_id: Uuid,
    trip_id: Option<Uuid>,
    amount: Decimal,
    kind: String,
    status: String,
    balance_after: Option<Decimal>,
    description: String,
    created_at: DateTime<Utc>,
}

impl From<LedgerRow> for LedgerTransaction {
    fn from(row: LedgerRow) -> Self {
        Self {
            id: row.id,
            pass_id: row.pass_id,
            trip_id: row.trip_id,
            amount: row.amount,
            kind: TransactionKind::from_str(&row.kind).unwrap_or(TransactionKind::Debit),
            status: TransactionStatus::from_str(&row.status)
                .unwrap_or(TransactionStatus::Success),
            balance_after: row.balance_after,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DailyStatsRow {
    total_debits: Decimal,
    total_credits: Decimal,
    transaction_count: i64,
    failed_count: i64,
}

//! Billing ledger service
//!
//! All balance mutations happen here, inside one Postgres transaction per
//! operation with the pass row locked `FOR UPDATE`, so concurrent debits on
//! the same pass serialize instead of racing. Every attempted debit leaves a
//! ledger row: rejections write a FAILED record (on its own connection, after
//! the aborted transaction) before the error propagates.

use chrono::{DateTime, Local, Utc};
use mobi_core::{
    models::{DailyLedgerStats, LedgerTransaction, PassStatus},
    traits::{DailySpendProvider, DebitOutcome, LedgerRepository, LedgerService},
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Start of the current local day, in UTC
fn local_midnight_utc() -> DateTime<Utc> {
    let today = Local::now().date_naive();
    today
        .and_hms_opt(0, 0, 0)
        .and_then(|t| t.and_local_timezone(Local).single())
        .map(|midnight| midnight.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Ledger service backed by Postgres
pub struct LedgerServiceImpl<L: LedgerRepository> {
    ledger_repo: Arc<L>,
    pool: Arc<PgPool>,
}

impl<L: LedgerRepository> LedgerServiceImpl<L> {
    /// Create a new ledger service
    pub fn new(ledger_repo: Arc<L>, pool: Arc<PgPool>) -> Self {
        Self { ledger_repo, pool }
    }

    /// Lock the pass row for the duration of the enclosing transaction
    async fn lock_pass(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        pass_id: Uuid,
    ) -> AppResult<LockedPass> {
        let row = sqlx::query_as::<sqlx::Postgres, LockedPassRow>(
            r#"
            SELECT id, status, balance, expiration_date
            FROM passes
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(pass_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            error!("Failed to lock pass {}: {}", pass_id, e);
            AppError::Database(format!("Failed to lock pass: {}", e))
        })?
        .ok_or_else(|| AppError::PassNotFound(pass_id.to_string()))?;

        Ok(row.into())
    }

    /// Record a FAILED debit on its own connection, after the aborted
    /// transaction has been dropped
    async fn record_failed_debit(
        &self,
        pass_id: Uuid,
        trip_id: Uuid,
        amount: Decimal,
        reason: &str,
    ) {
        let failed = LedgerTransaction::failed_debit(pass_id, Some(trip_id), amount, reason);

        if let Err(e) = self.ledger_repo.record(&failed).await {
            error!(
                "Failed to record FAILED debit for pass {}: {}",
                pass_id, e
            );
        }
    }

    /// Validate the locked pass for debiting; lazily expires it first
    async fn check_debitable(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        pass: &mut LockedPass,
    ) -> AppResult<()> {
        if pass.status == PassStatus::Active && pass.expiration_date < Utc::now() {
            info!("Pass {} is past expiration, marking expired", pass.id);

            sqlx::query(
                r#"
                UPDATE passes
                SET status = 'expired',
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(pass.id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::Database(format!("Failed to expire pass: {}", e)))?;

            pass.status = PassStatus::Expired;
        }

        match pass.status {
            PassStatus::Active => Ok(()),
            PassStatus::Suspended => Err(AppError::PassSuspended(pass.id.to_string())),
            PassStatus::Expired => Err(AppError::PassExpired(pass.id.to_string())),
        }
    }
}

#[async_trait]
impl<L: LedgerRepository> LedgerService for LedgerServiceImpl<L> {
    #[instrument(skip(self, description))]
    async fn debit(
        &self,
        pass_id: Uuid,
        trip_id: Uuid,
        amount: Decimal,
        description: &str,
    ) -> AppResult<DebitOutcome> {
        info!("Debiting {} from pass {} for trip {}", amount, pass_id, trip_id);

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let mut pass = Self::lock_pass(&mut tx, pass_id).await?;

        if let Err(e) = Self::check_debitable(&mut tx, &mut pass).await {
            // Keep the lazy expiry even though the debit is rejected
            if pass.status == PassStatus::Expired {
                if let Err(commit_err) = tx.commit().await {
                    warn!(
                        "Failed to commit lazy expiry for pass {}: {}",
                        pass_id, commit_err
                    );
                }
            } else {
                drop(tx);
            }
            self.record_failed_debit(pass_id, trip_id, amount, &e.to_string())
                .await;
            return Err(e);
        }

        if pass.balance < amount {
            warn!(
                "Insufficient balance on pass {}: required {}, available {}",
                pass_id, amount, pass.balance
            );
            let err = AppError::InsufficientBalance {
                required: amount.to_string(),
                available: pass.balance.to_string(),
            };
            drop(tx);
            self.record_failed_debit(pass_id, trip_id, amount, &err.to_string())
                .await;
            return Err(err);
        }

        let balance_after = pass.balance - amount;

        sqlx::query(
            r#"
            UPDATE passes
            SET balance = balance - $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(pass_id)
        .bind(amount)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to update pass balance: {}", e);
            AppError::Database(format!("Failed to update balance: {}", e))
        })?;

        let record =
            LedgerTransaction::success_debit(pass_id, Some(trip_id), amount, balance_after, description.to_string());

        sqlx::query(
            r#"
            INSERT INTO ledger_transactions (
                id, pass_id, trip_id, amount, kind, status,
                balance_after, description, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(record.pass_id)
        .bind(record.trip_id)
        .bind(record.amount)
        .bind(record.kind.to_string())
        .bind(record.status.to_string())
        .bind(record.balance_after)
        .bind(&record.description)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to record debit: {}", e);
            AppError::Database(format!("Failed to record debit: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Debited {} from pass {}: balance_after={}",
            amount, pass_id, balance_after
        );

        Ok(DebitOutcome {
            transaction_id: record.id,
            balance_after,
        })
    }

    #[instrument(skip(self, description))]
    async fn credit(
        &self,
        pass_id: Uuid,
        amount: Decimal,
        description: &str,
    ) -> AppResult<DebitOutcome> {
        info!("Crediting {} to pass {}", amount, pass_id);

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        // Recharge is intentionally permissive: any existing pass can be
        // topped up regardless of status
        let pass = Self::lock_pass(&mut tx, pass_id).await?;
        let balance_after = pass.balance + amount;

        sqlx::query(
            r#"
            UPDATE passes
            SET balance = balance + $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(pass_id)
        .bind(amount)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to update pass balance: {}", e);
            AppError::Database(format!("Failed to update balance: {}", e))
        })?;

        let record =
            LedgerTransaction::success_credit(pass_id, amount, balance_after, description.to_string());

        sqlx::query(
            r#"
            INSERT INTO ledger_transactions (
                id, pass_id, trip_id, amount, kind, status,
                balance_after, description, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(record.pass_id)
        .bind(record.trip_id)
        .bind(record.amount)
        .bind(record.kind.to_string())
        .bind(record.status.to_string())
        .bind(record.balance_after)
        .bind(&record.description)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to record credit: {}", e);
            AppError::Database(format!("Failed to record credit: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Credited {} to pass {}: balance_after={}",
            amount, pass_id, balance_after
        );

        Ok(DebitOutcome {
            transaction_id: record.id,
            balance_after,
        })
    }

    #[instrument(skip(self))]
    async fn daily_total(&self, pass_id: Uuid) -> AppResult<Decimal> {
        self.ledger_repo
            .sum_success_debits_since(pass_id, local_midnight_utc())
            .await
    }

    #[instrument(skip(self))]
    async fn history(&self, pass_id: Uuid) -> AppResult<Vec<LedgerTransaction>> {
        self.ledger_repo.history_for_pass(pass_id).await
    }

    #[instrument(skip(self))]
    async fn transaction(&self, id: Uuid) -> AppResult<LedgerTransaction> {
        self.ledger_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    async fn daily_stats(&self) -> AppResult<DailyLedgerStats> {
        self.ledger_repo.stats_since(local_midnight_utc()).await
    }
}

#[async_trait]
impl<L: LedgerRepository> DailySpendProvider for LedgerServiceImpl<L> {
    async fn daily_total(&self, pass_id: Uuid) -> AppResult<Decimal> {
        LedgerService::daily_total(self, pass_id).await
    }
}

/// Pass fields needed while the row is locked
struct LockedPass {
    id: Uuid,
    status: PassStatus,
    balance: Decimal,
    expiration_date: DateTime<Utc>,
}

/// Helper struct for locked pass row mapping
#[derive(Debug, sqlx::FromRow)]
struct LockedPassRow {
    id: Uuid,
    status: String,
    balance: Decimal,
    expiration_date: DateTime<Utc>,
}

impl From<LockedPassRow> for LockedPass {
    fn from(row: LockedPassRow) -> Self {
        Self {
            id: row.id,
            status: PassStatus::from_str(&row.status).unwrap_or(PassStatus::Active),
            balance: row.balance,
            expiration_date: row.expiration_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_midnight_is_today() {
        let midnight = local_midnight_utc();
        assert!(midnight <= Utc::now());
        // Within the last 26 hours regardless of timezone offset
        assert!(Utc::now() - midnight < chrono::Duration::hours(26));
    }
}

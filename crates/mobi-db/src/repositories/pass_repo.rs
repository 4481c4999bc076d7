//! Pass repository implementation
//!
//! Read-mostly access to mobility passes. Balance mutations do NOT go through
//! this repository; they are performed inside the billing ledger's
//! transactional debit/credit path. Expiry is applied lazily: the first read
//! past the expiration date flips the status to `expired`.

use chrono::{DateTime, Utc};
use mobi_core::{
    models::{Pass, PassStatus, PassTier},
    traits::PassRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of PassRepository
pub struct PgPassRepository {
    pool: PgPool,
}

impl PgPassRepository {
    /// Create a new pass repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Flip an out-of-date pass to expired, returning the updated row
    async fn expire_if_due(&self, pass: Pass) -> AppResult<Pass> {
        if !pass.is_past_expiration(Utc::now()) {
            return Ok(pass);
        }

        info!("Pass {} is past expiration, marking expired", pass.pass_number);

        let row = sqlx::query_as::<sqlx::Postgres, PassRow>(
            r#"
            UPDATE passes
            SET status = 'expired',
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, rider_id, pass_number, status, balance,
                expiration_date, tier, created_at, updated_at
            "#,
        )
        .bind(pass.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error expiring pass {}: {}", pass.id, e);
            AppError::Database(format!("Failed to expire pass: {}", e))
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl PassRepository for PgPassRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Pass>> {
        debug!("Finding pass by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, PassRow>(
            r#"
            SELECT
                id, rider_id, pass_number, status, balance,
                expiration_date, tier, created_at, updated_at
            FROM passes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding pass {}: {}", id, e);
            AppError::Database(format!("Failed to find pass: {}", e))
        })?;

        match result {
            Some(row) => Ok(Some(self.expire_if_due(row.into()).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_rider(&self, rider_id: Uuid) -> AppResult<Option<Pass>> {
        debug!("Finding pass by rider: {}", rider_id);

        let result = sqlx::query_as::<sqlx::Postgres, PassRow>(
            r#"
            SELECT
                id, rider_id, pass_number, status, balance,
                expiration_date, tier, created_at, updated_at
            FROM passes
            WHERE rider_id = $1
            "#,
        )
        .bind(rider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding pass for rider {}: {}", rider_id, e);
            AppError::Database(format!("Failed to find pass: {}", e))
        })?;

        match result {
            Some(row) => Ok(Some(self.expire_if_due(row.into()).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, pass))]
    async fn create(&self, pass: &Pass) -> AppResult<Pass> {
        debug!("Creating pass: {}", pass.pass_number);

        let row = sqlx::query_as::<sqlx::Postgres, PassRow>(
            r#"
            INSERT INTO passes (
                id, rider_id, pass_number, status, balance,
                expiration_date, tier
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
                id, rider_id, pass_number, status, balance,
                expiration_date, tier, created_at, updated_at
            "#,
        )
        .bind(pass.id)
        .bind(pass.rider_id)
        .bind(&pass.pass_number)
        .bind(pass.status.to_string())
        .bind(pass.balance)
        .bind(pass.expiration_date)
        .bind(pass.tier.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating pass: {}", e);
            if e.to_string().contains("unique constraint") {
                AppError::Conflict(format!("Pass {} already exists", pass.pass_number))
            } else {
                AppError::Database(format!("Failed to create pass: {}", e))
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn set_status(&self, id: Uuid, status: PassStatus) -> AppResult<()> {
        debug!("Setting pass {} status to {}", id, status);

        let result = sqlx::query(
            r#"
            UPDATE passes
            SET status = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating pass {} status: {}", id, e);
            AppError::Database(format!("Failed to update pass status: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::PassNotFound(id.to_string()));
        }

        Ok(())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct PassRow {
    id: Uuid,
    rider_id: Uuid,
    pass_number: String,
    status: String,
    balance: Decimal,
    expiration_date: DateTime<Utc>,
    tier: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PassRow> for Pass {
    fn from(row: PassRow) -> Self {
        Self {
            id: row.id,
            rider_id: row.rider_id,
            pass_number: row.pass_number,
            status: PassStatus::from_str(&row.status).unwrap_or(PassStatus::Active),
            balance: row.balance,
            expiration_date: row.expiration_date,
            tier: PassTier::from_str(&row.tier).unwrap_or(PassTier::Standard),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

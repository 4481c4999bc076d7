//! Fare calculation audit repository
//!
//! One audit row per trip; recalculating a trip replaces the earlier row.

use chrono::{DateTime, Utc};
use mobi_core::{models::FareCalculation, traits::FareCalculationRepository, AppError, AppResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of FareCalculationRepository
pub struct PgFareCalculationRepository {
    pool: PgPool,
}

impl PgFareCalculationRepository {
    /// Create a new fare calculation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FareCalculationRepository for PgFareCalculationRepository {
    #[instrument(skip(self, calc))]
    async fn upsert(&self, calc: &FareCalculation) -> AppResult<FareCalculation> {
        debug!("Upserting fare calculation for trip {}", calc.trip_id);

        let row = sqlx::query_as::<sqlx::Postgres, FareCalculationRow>(
            r#"
            INSERT INTO fare_calculations (
                id, trip_id, pass_id, base_amount, discount_amount,
                final_amount, applied_discounts, capped_by_daily_limit,
                fallback_used, calculated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (trip_id) DO UPDATE SET
                base_amount = EXCLUDED.base_amount,
                discount_amount = EXCLUDED.discount_amount,
                final_amount = EXCLUDED.final_amount,
                applied_discounts = EXCLUDED.applied_discounts,
                capped_by_daily_limit = EXCLUDED.capped_by_daily_limit,
                fallback_used = EXCLUDED.fallback_used,
                calculated_at = EXCLUDED.calculated_at
            RETURNING
                id, trip_id, pass_id, base_amount, discount_amount,
                final_amount, applied_discounts, capped_by_daily_limit,
                fallback_used, calculated_at
            "#,
        )
        .bind(calc.id)
        .bind(calc.trip_id)
        .bind(calc.pass_id)
        .bind(calc.base_amount)
        .bind(calc.discount_amount)
        .bind(calc.final_amount)
        .bind(Json(&calc.applied_discounts))
        .bind(calc.capped_by_daily_limit)
        .bind(calc.fallback_used)
        .bind(calc.calculated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error upserting fare calculation: {}", e);
            AppError::Database(format!("Failed to upsert fare calculation: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_trip(&self, trip_id: Uuid) -> AppResult<Option<FareCalculation>> {
        debug!("Finding fare calculation for trip {}", trip_id);

        let result = sqlx::query_as::<sqlx::Postgres, FareCalculationRow>(
            r#"
            SELECT
                id, trip_id, pass_id, base_amount, discount_amount,
                final_amount, applied_discounts, capped_by_daily_limit,
                fallback_used, calculated_at
            FROM fare_calculations
            WHERE trip_id = $1
            "#,
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding fare calculation for trip {}: {}", trip_id, e);
            AppError::Database(format!("Failed to find fare calculation: {}", e))
        })?;

        Ok(result.map(FareCalculation::from))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct FareCalculationRow {
    id: Uuid,
    trip_id: Uuid,
    pass_id: Uuid,
    base_amount: Decimal,
    discount_amount: Decimal,
    final_amount: Decimal,
    applied_discounts: Json<Vec<String>>,
    capped_by_daily_limit: bool,
    fallback_used: bool,
    calculated_at: DateTime<Utc>,
}

impl From<FareCalculationRow> for FareCalculation {
    fn from(row: FareCalculationRow) -> Self {
        Self {
            id: row.id,
            trip_id: row.trip_id,
            pass_id: row.pass_id,
            base_amount: row.base_amount,
            discount_amount: row.discount_amount,
            final_amount: row.final_amount,
            applied_discounts: row.applied_discounts.0,
            capped_by_daily_limit: row.capped_by_daily_limit,
            fallback_used: row.fallback_used,
            calculated_at: row.calculated_at,
        }
    }
}

//! Fare rule and discount policy repositories
//!
//! Both tables are administered out of band and read-only from the
//! application's point of view.

use chrono::{DateTime, Utc};
use mobi_core::{
    models::{DiscountKind, DiscountPolicy, FareRule, PassTier, TransportMode},
    traits::{DiscountPolicyRepository, FareRuleRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};

/// PostgreSQL implementation of FareRuleRepository
pub struct PgFareRuleRepository {
    pool: PgPool,
}

impl PgFareRuleRepository {
    /// Create a new fare rule repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FareRuleRepository for PgFareRuleRepository {
    #[instrument(skip(self))]
    async fn find_active_by_mode(&self, mode: TransportMode) -> AppResult<Option<FareRule>> {
        debug!("Finding active fare rule for {}", mode);

        let result = sqlx::query_as::<sqlx::Postgres, FareRuleRow>(
            r#"
            SELECT
                id, transport_mode, base_price, price_per_km,
                off_peak_discount_pct, daily_cap_amount, active,
                created_at, updated_at
            FROM fare_rules
            WHERE transport_mode = $1
              AND active = TRUE
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(mode.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding fare rule for {}: {}", mode, e);
            AppError::Database(format!("Failed to find fare rule: {}", e))
        })?;

        Ok(result.map(FareRule::from))
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> AppResult<Vec<FareRule>> {
        let rows = sqlx::query_as::<sqlx::Postgres, FareRuleRow>(
            r#"
            SELECT
                id, transport_mode, base_price, price_per_km,
                off_peak_discount_pct, daily_cap_amount, active,
                created_at, updated_at
            FROM fare_rules
            ORDER BY transport_mode, updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing fare rules: {}", e);
            AppError::Database(format!("Failed to list fare rules: {}", e))
        })?;

        Ok(rows.into_iter().map(FareRule::from).collect())
    }
}

/// PostgreSQL implementation of DiscountPolicyRepository
pub struct PgDiscountPolicyRepository {
    pool: PgPool,
}

impl PgDiscountPolicyRepository {
    /// Create a new discount policy repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DiscountPolicyRepository for PgDiscountPolicyRepository {
    #[instrument(skip(self))]
    async fn list_active(&self) -> AppResult<Vec<DiscountPolicy>> {
        let rows = sqlx::query_as::<sqlx::Postgres, DiscountPolicyRow>(
            r#"
            SELECT
                id, name, kind, value, min_trips_required,
                applicable_tier, active
            FROM discount_policies
            WHERE active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing discount policies: {}", e);
            AppError::Database(format!("Failed to list discount policies: {}", e))
        })?;

        // Rows with an unknown kind are skipped rather than failing the lookup
        let mut policies = Vec::with_capacity(rows.len());
        for row in rows {
            match DiscountKind::from_str(&row.kind) {
                Some(kind) => policies.push(DiscountPolicy {
                    id: row.id,
                    name: row.name,
                    kind,
                    value: row.value,
                    min_trips_required: row.min_trips_required,
                    applicable_tier: row
                        .applicable_tier
                        .as_deref()
                        .and_then(PassTier::from_str),
                    active: row.active,
                }),
                None => {
                    warn!("Skipping discount policy {} with unknown kind {}", row.id, row.kind);
                }
            }
        }

        Ok(policies)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct FareRuleRow {
    id: i32,
    transport_mode: String,
    base_price: Decimal,
    price_per_km: Decimal,
    off_peak_discount_pct: Decimal,
    daily_cap_amount: Option<Decimal>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FareRuleRow> for FareRule {
    fn from(row: FareRuleRow) -> Self {
        Self {
            id: row.id,
            transport_mode: TransportMode::from_str(&row.transport_mode)
                .unwrap_or(TransportMode::Bus),
            base_price: row.base_price,
            price_per_km: row.price_per_km,
            off_peak_discount_pct: row.off_peak_discount_pct,
            daily_cap_amount: row.daily_cap_amount,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct DiscountPolicyRow {
    id: i32,
    name: String,
    kind: String,
    value: Decimal,
    min_trips_required: Option<i64>,
    applicable_tier: Option<String>,
    active: bool,
}

//! Common traits for repositories and services
//!
//! Defines abstractions for database access and business logic. Stores with
//! append-only invariants (ledger, fare calculations) expose focused traits
//! instead of a blanket CRUD contract: there is deliberately no way to update
//! or delete a ledger row.

use crate::error::AppError;
use crate::models::{
    DailyLedgerStats, DiscountPolicy, FareCalculation, FareResult, FareRule, LedgerTransaction,
    Pass, PassStatus, PricingFallbackEvent, PricingRequest, TransportMode, Trip, TripCompletedEvent,
    TripStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// Cache abstraction for key-value operations
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError>;

    /// Delete a key from cache
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool, AppError>;
}

/// Pass store
///
/// The balance column is intentionally absent from this trait: only the
/// billing ledger's transactional debit/credit path may change it.
#[async_trait]
pub trait PassRepository: Send + Sync {
    /// Find pass by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Pass>, AppError>;

    /// Find the pass owned by a rider
    async fn find_by_rider(&self, rider_id: Uuid) -> Result<Option<Pass>, AppError>;

    /// Create a new pass
    async fn create(&self, pass: &Pass) -> Result<Pass, AppError>;

    /// Update the lifecycle status (lazy expiry, suspension, reactivation)
    async fn set_status(&self, id: Uuid, status: PassStatus) -> Result<(), AppError>;
}

/// Trip store
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Persist a new trip row
    async fn create(&self, trip: &Trip) -> Result<Trip, AppError>;

    /// Settle a trip: status, fare and arrival time in one update
    async fn settle(
        &self,
        id: Uuid,
        status: TripStatus,
        computed_fare: Option<Decimal>,
        arrival_time: Option<NaiveDateTime>,
    ) -> Result<Trip, AppError>;

    /// Find trip by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>, AppError>;

    /// Trips of one rider, newest first
    async fn list_by_rider(&self, rider_id: Uuid) -> Result<Vec<Trip>, AppError>;

    /// Trips charged to one pass, newest first
    async fn list_by_pass(&self, pass_id: Uuid) -> Result<Vec<Trip>, AppError>;

    /// Rider's lifetime trip count, input to the loyalty discount
    async fn count_by_rider(&self, rider_id: Uuid) -> Result<i64, AppError>;
}

/// Fare rule store, read-only to the pricing path
#[async_trait]
pub trait FareRuleRepository: Send + Sync {
    /// Active rule for a transport mode, if any
    async fn find_active_by_mode(
        &self,
        mode: TransportMode,
    ) -> Result<Option<FareRule>, AppError>;

    /// All rules, active or not
    async fn list_all(&self) -> Result<Vec<FareRule>, AppError>;
}

/// Discount policy store, read-only to the pricing path
#[async_trait]
pub trait DiscountPolicyRepository: Send + Sync {
    /// All active policies
    async fn list_active(&self) -> Result<Vec<DiscountPolicy>, AppError>;
}

/// Fare calculation audit store
///
/// One row per trip; recalculating upserts the existing row.
#[async_trait]
pub trait FareCalculationRepository: Send + Sync {
    /// Insert or overwrite the calculation for a trip
    async fn upsert(&self, calculation: &FareCalculation) -> Result<FareCalculation, AppError>;

    /// Calculation for a trip, if priced already
    async fn find_by_trip(&self, trip_id: Uuid) -> Result<Option<FareCalculation>, AppError>;
}

/// Ledger transaction store, append-only
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Append a transaction record
    async fn record(&self, tx: &LedgerTransaction) -> Result<LedgerTransaction, AppError>;

    /// Transaction by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LedgerTransaction>, AppError>;

    /// All transactions of a pass, newest first
    async fn history_for_pass(&self, pass_id: Uuid) -> Result<Vec<LedgerTransaction>, AppError>;

    /// Sum of SUCCESS DEBIT amounts for a pass since `since`
    async fn sum_success_debits_since(
        &self,
        pass_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Decimal, AppError>;

    /// Aggregated ledger figures since `since`
    async fn stats_since(&self, since: DateTime<Utc>) -> Result<DailyLedgerStats, AppError>;
}

/// Pricing service: prices one trip
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Calculate the fare for a trip
    async fn calculate_fare(&self, request: &PricingRequest) -> Result<FareResult, AppError>;
}

/// Provider of "today's spend" for a pass, consulted by the daily-cap step
#[async_trait]
pub trait DailySpendProvider: Send + Sync {
    /// Sum of today's successful debits for a pass
    async fn daily_total(&self, pass_id: Uuid) -> Result<Decimal, AppError>;
}

/// Outcome of a successful debit
#[derive(Debug, Clone)]
pub struct DebitOutcome {
    pub transaction_id: Uuid,
    pub balance_after: Decimal,
}

/// Billing ledger service
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Debit a pass for a trip; writes a FAILED record before any error
    /// propagates
    async fn debit(
        &self,
        pass_id: Uuid,
        trip_id: Uuid,
        amount: Decimal,
        description: &str,
    ) -> Result<DebitOutcome, AppError>;

    /// Credit (recharge) a pass unconditionally
    async fn credit(
        &self,
        pass_id: Uuid,
        amount: Decimal,
        description: &str,
    ) -> Result<DebitOutcome, AppError>;

    /// Today's successful debit total for a pass (zero when none)
    async fn daily_total(&self, pass_id: Uuid) -> Result<Decimal, AppError>;

    /// Transaction history for a pass
    async fn history(&self, pass_id: Uuid) -> Result<Vec<LedgerTransaction>, AppError>;

    /// Single transaction lookup
    async fn transaction(&self, id: Uuid) -> Result<LedgerTransaction, AppError>;

    /// Today's aggregated figures
    async fn daily_stats(&self) -> Result<DailyLedgerStats, AppError>;
}

/// Best-effort event publisher
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a trip-completed event
    async fn publish_trip_completed(&self, event: &TripCompletedEvent) -> Result<(), AppError>;

    /// Publish a pricing-fallback event
    async fn publish_pricing_fallback(
        &self,
        event: &PricingFallbackEvent,
    ) -> Result<(), AppError>;
}

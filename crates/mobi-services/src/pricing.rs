//! Pricing service implementation
//!
//! Resolves the active fare rule (Redis cache, then Postgres, then the
//! hard-coded default table), builds the discount schedule from config
//! defaults overridden by active `DiscountPolicy` rows, and runs the fare
//! engine. Every calculation leaves an audit row keyed by trip id.

use crate::fare_engine::{self, DiscountSchedule, FareInput};
use crate::resilience::ResilientSpendClient;
use mobi_cache::{keys, RedisCache};
use mobi_core::{
    config::PricingConfig,
    models::{
        DiscountKind, DiscountPolicy, FareCalculation, FareResult, FareRule, PricingRequest,
        TransportMode,
    },
    traits::{
        CacheService, DailySpendProvider, DiscountPolicyRepository, FareCalculationRepository,
        FareRuleRepository, PricingService,
    },
    AppResult,
};
use async_trait::async_trait;
use rust_decimal::{prelude::FromPrimitive, Decimal};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Convert a config float to Decimal, falling back on a literal default
fn dec_from_f64(value: f64, default: Decimal) -> Decimal {
    Decimal::from_f64(value).unwrap_or(default)
}

/// Pricing service with cached rule lookup and audit trail
pub struct PricingServiceImpl<R, D, C, S>
where
    R: FareRuleRepository,
    D: DiscountPolicyRepository,
    C: FareCalculationRepository,
    S: DailySpendProvider,
{
    rule_repo: Arc<R>,
    policy_repo: Arc<D>,
    calc_repo: Arc<C>,
    spend_client: Arc<ResilientSpendClient<S>>,
    cache: Arc<RedisCache>,
    config: PricingConfig,
}

impl<R, D, C, S> PricingServiceImpl<R, D, C, S>
where
    R: FareRuleRepository,
    D: DiscountPolicyRepository,
    C: FareCalculationRepository,
    S: DailySpendProvider,
{
    /// Create a new pricing service
    pub fn new(
        rule_repo: Arc<R>,
        policy_repo: Arc<D>,
        calc_repo: Arc<C>,
        spend_client: Arc<ResilientSpendClient<S>>,
        cache: Arc<RedisCache>,
        config: PricingConfig,
    ) -> Self {
        Self {
            rule_repo,
            policy_repo,
            calc_repo,
            spend_client,
            cache,
            config,
        }
    }

    /// Try to get the active rule from cache
    async fn rule_from_cache(&self, mode: TransportMode) -> Option<FareRule> {
        let key = keys::fare_rule_key(&mode.to_string());

        match self.cache.get::<FareRule>(&key).await {
            Ok(rule) => {
                if rule.is_some() {
                    debug!("Fare rule cache HIT for {}", mode);
                }
                rule
            }
            Err(e) => {
                warn!("Cache error for fare rule {}: {}", mode, e);
                // Don't fail on cache errors, just continue without cache
                None
            }
        }
    }

    /// Store a rule in cache
    async fn store_rule_in_cache(&self, mode: TransportMode, rule: &FareRule) {
        let key = keys::fare_rule_key(&mode.to_string());

        if let Err(e) = self
            .cache
            .set(&key, rule, keys::FARE_RULE_TTL_SECS)
            .await
        {
            warn!("Failed to cache fare rule for {}: {}", mode, e);
        }
    }

    /// Try to get the active discount policies from cache
    async fn policies_from_cache(&self) -> Option<Vec<DiscountPolicy>> {
        match self.cache.get::<Vec<DiscountPolicy>>(keys::DISCOUNT_POLICIES_KEY).await {
            Ok(policies) => {
                if policies.is_some() {
                    debug!("Discount policy cache HIT");
                }
                policies
            }
            Err(e) => {
                warn!("Cache error for discount policies: {}", e);
                None
            }
        }
    }

    /// Store the active discount policies in cache
    async fn store_policies_in_cache(&self, policies: &Vec<DiscountPolicy>) {
        if let Err(e) = self
            .cache
            .set(
                keys::DISCOUNT_POLICIES_KEY,
                policies,
                keys::DISCOUNT_POLICIES_TTL_SECS,
            )
            .await
        {
            warn!("Failed to cache discount policies: {}", e);
        }
    }

    /// Active rule for a mode: cache, then database, then the default table
    async fn resolve_rule(&self, mode: TransportMode) -> AppResult<FareRule> {
        if let Some(rule) = self.rule_from_cache(mode).await {
            return Ok(rule);
        }

        debug!("Fare rule cache MISS for {}", mode);
        match self.rule_repo.find_active_by_mode(mode).await? {
            Some(rule) => {
                self.store_rule_in_cache(mode, &rule).await;
                Ok(rule)
            }
            None => {
                warn!("No active fare rule for {}, using built-in default", mode);
                Ok(FareRule::default_for(mode))
            }
        }
    }

    /// Discount schedule: config defaults + rule off-peak pct, overridden by
    /// active discount policies
    async fn build_schedule(&self, rule: &FareRule) -> AppResult<DiscountSchedule> {
        let mut schedule = DiscountSchedule {
            off_peak_start_hour: self.config.off_peak_start_hour,
            off_peak_end_hour: self.config.off_peak_end_hour,
            off_peak_pct: rule.off_peak_discount_pct,
            loyalty_trips_required: self.config.loyalty_trips_required,
            loyalty_pct: dec_from_f64(self.config.loyalty_discount_pct, Decimal::from(5)),
            daily_cap: rule.daily_cap_amount.unwrap_or_else(|| {
                dec_from_f64(self.config.daily_cap, Decimal::from(2000))
            }),
        };

        let policies = match self.policies_from_cache().await {
            Some(policies) => policies,
            None => {
                debug!("Discount policy cache MISS");
                let policies = self.policy_repo.list_active().await?;
                self.store_policies_in_cache(&policies).await;
                policies
            }
        };

        for policy in policies {
            match policy.kind {
                DiscountKind::OffPeak => schedule.off_peak_pct = policy.value,
                DiscountKind::Loyalty => {
                    schedule.loyalty_pct = policy.value;
                    if let Some(min_trips) = policy.min_trips_required {
                        schedule.loyalty_trips_required = min_trips;
                    }
                }
                // A rule-level cap override wins over a policy row
                DiscountKind::DailyCap if rule.daily_cap_amount.is_none() => {
                    schedule.daily_cap = policy.value;
                }
                _ => {}
            }
        }

        Ok(schedule)
    }

    /// Persist the audit row; failures are logged, never propagated
    async fn write_audit(&self, request: &PricingRequest, result: &FareResult) {
        let calc = FareCalculation::from_result(request.trip_id, request.pass_id, result);

        if let Err(e) = self.calc_repo.upsert(&calc).await {
            warn!(
                "Failed to persist fare calculation for trip {}: {}",
                request.trip_id, e
            );
        }
    }

    /// All fare rules, for the admin listing endpoint
    pub async fn list_rules(&self) -> AppResult<Vec<FareRule>> {
        self.rule_repo.list_all().await
    }

    /// Audit row for a trip, if it was priced
    pub async fn calculation_for_trip(
        &self,
        trip_id: uuid::Uuid,
    ) -> AppResult<Option<FareCalculation>> {
        self.calc_repo.find_by_trip(trip_id).await
    }
}

#[async_trait]
impl<R, D, C, S> PricingService for PricingServiceImpl<R, D, C, S>
where
    R: FareRuleRepository,
    D: DiscountPolicyRepository,
    C: FareCalculationRepository,
    S: DailySpendProvider,
{
    #[instrument(skip(self, request), fields(trip_id = %request.trip_id))]
    async fn calculate_fare(&self, request: &PricingRequest) -> AppResult<FareResult> {
        debug!(
            "Pricing trip {} ({} {}km)",
            request.trip_id, request.transport_mode, request.distance_km
        );

        let rule = self.resolve_rule(request.transport_mode).await?;
        let schedule = self.build_schedule(&rule).await?;
        let daily_spend = self.spend_client.daily_total(request.pass_id).await;

        let input = FareInput {
            distance_km: request.distance_km,
            departure_time: request.departure_time,
            tier: request.tier,
            total_trips: request.total_trips,
            daily_spend,
        };

        let result = fare_engine::calculate(&input, &rule, &schedule);

        debug!(
            "Trip {} priced: base={} final={} (capped: {})",
            request.trip_id, result.base_amount, result.final_amount, result.capped_by_daily_limit
        );

        self.write_audit(request, &result).await;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dec_from_f64() {
        assert_eq!(dec_from_f64(20.0, Decimal::ZERO), Decimal::from(20));
        assert_eq!(dec_from_f64(f64::NAN, Decimal::from(5)), Decimal::from(5));
    }
}

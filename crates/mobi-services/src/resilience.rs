//! Breaker-guarded wrappers around the outbound pricing call sites
//!
//! Two independent wrappers, each with its own breaker and its own fallback:
//!
//! - `ResilientPricingClient` guards the fare calculation; when the circuit
//!   is open or the call fails it substitutes a static per-mode flat fare.
//!   It never returns an error.
//! - `ResilientSpendClient` guards the daily-total lookup; when the circuit
//!   is open or the call fails it reports the spend as unknown (`None`),
//!   which makes the fare engine skip the daily-cap step.

use crate::breaker::CircuitBreaker;
use crate::constants::{FALLBACK_FARE_BRT, FALLBACK_FARE_BUS, FALLBACK_FARE_TER};
use mobi_core::{
    models::{FareResult, PricingRequest, TransportMode},
    traits::{DailySpendProvider, PricingService},
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Static flat fares used when pricing is unavailable, keyed by mode
fn fallback_table() -> HashMap<TransportMode, Decimal> {
    let mut table = HashMap::new();
    table.insert(TransportMode::Bus, FALLBACK_FARE_BUS);
    table.insert(TransportMode::Brt, FALLBACK_FARE_BRT);
    table.insert(TransportMode::Ter, FALLBACK_FARE_TER);
    table
}

/// Breaker-guarded pricing client with a flat-fare fallback
pub struct ResilientPricingClient<P: PricingService> {
    pricing: Arc<P>,
    breaker: Arc<CircuitBreaker>,
    fallback_fares: HashMap<TransportMode, Decimal>,
}

impl<P: PricingService> ResilientPricingClient<P> {
    /// Create a new resilient pricing client
    pub fn new(pricing: Arc<P>, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            pricing,
            breaker,
            fallback_fares: fallback_table(),
        }
    }

    /// Flat fallback fare for a mode; an unknown mode gets the BUS fare
    fn fallback_fare(&self, mode: TransportMode) -> Decimal {
        self.fallback_fares
            .get(&mode)
            .copied()
            .unwrap_or(FALLBACK_FARE_BUS)
    }

    fn fallback_result(&self, mode: TransportMode, reason: &str) -> FareResult {
        let amount = self.fallback_fare(mode);
        warn!("Using fallback flat fare {} for {}: {}", amount, mode, reason);

        FareResult {
            base_amount: amount,
            discount_amount: Decimal::ZERO,
            final_amount: amount,
            applied_discounts: Vec::new(),
            capped_by_daily_limit: false,
            fallback_used: true,
            note: format!("Fallback flat fare ({})", reason),
        }
    }

    /// Price a trip; always succeeds.
    ///
    /// `fallback_used` on the result tells the caller whether the real
    /// pricing path ran.
    #[instrument(skip(self, request), fields(trip_id = %request.trip_id))]
    pub async fn calculate_fare(&self, request: &PricingRequest) -> FareResult {
        if !self.breaker.try_acquire() {
            return self.fallback_result(request.transport_mode, "pricing circuit open");
        }

        match self.pricing.calculate_fare(request).await {
            Ok(result) => {
                self.breaker.record_success();
                result
            }
            Err(e) => {
                self.breaker.record_failure();
                self.fallback_result(request.transport_mode, &e.to_string())
            }
        }
    }
}

/// Breaker-guarded daily-spend client
///
/// Reports `None` instead of failing, so a degraded ledger read never blocks
/// pricing; the cap step is simply skipped.
pub struct ResilientSpendClient<S: DailySpendProvider> {
    provider: Arc<S>,
    breaker: Arc<CircuitBreaker>,
}

impl<S: DailySpendProvider> ResilientSpendClient<S> {
    /// Create a new resilient spend client
    pub fn new(provider: Arc<S>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { provider, breaker }
    }

    /// Today's spend for a pass, or `None` when it cannot be determined
    #[instrument(skip(self))]
    pub async fn daily_total(&self, pass_id: Uuid) -> Option<Decimal> {
        if !self.breaker.try_acquire() {
            debug!("Spend circuit open, reporting unknown spend for {}", pass_id);
            return None;
        }

        match self.provider.daily_total(pass_id).await {
            Ok(total) => {
                self.breaker.record_success();
                Some(total)
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!("Daily spend lookup failed for {}: {}", pass_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::BreakerState;
    use async_trait::async_trait;
    use mobi_core::{config::BreakerConfig, models::PassTier, AppError, AppResult};
    use rust_decimal_macros::dec;

    struct MockPricing {
        fail: bool,
    }

    #[async_trait]
    impl PricingService for MockPricing {
        async fn calculate_fare(&self, _request: &PricingRequest) -> AppResult<FareResult> {
            if self.fail {
                return Err(AppError::PricingUnavailable("db down".to_string()));
            }
            Ok(FareResult {
                base_amount: dec!(400),
                discount_amount: dec!(0),
                final_amount: dec!(400),
                applied_discounts: vec![],
                capped_by_daily_limit: false,
                fallback_used: false,
                note: "Standard fare".to_string(),
            })
        }
    }

    struct MockSpend {
        fail: bool,
    }

    #[async_trait]
    impl DailySpendProvider for MockSpend {
        async fn daily_total(&self, _pass_id: Uuid) -> AppResult<Decimal> {
            if self.fail {
                return Err(AppError::Database("down".to_string()));
            }
            Ok(dec!(1200))
        }
    }

    fn breaker() -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new("test", &BreakerConfig::default()))
    }

    fn request(mode: TransportMode) -> PricingRequest {
        PricingRequest {
            trip_id: Uuid::new_v4(),
            transport_mode: mode,
            distance_km: dec!(10),
            departure_time: None,
            pass_id: Uuid::new_v4(),
            tier: PassTier::Standard,
            total_trips: 0,
        }
    }

    #[tokio::test]
    async fn test_pricing_passthrough_when_closed() {
        let client = ResilientPricingClient::new(Arc::new(MockPricing { fail: false }), breaker());

        let result = client.calculate_fare(&request(TransportMode::Bus)).await;
        assert!(!result.fallback_used);
        assert_eq!(result.final_amount, dec!(400));
    }

    #[tokio::test]
    async fn test_pricing_fallback_on_open_circuit() {
        let b = breaker();
        b.force_state(BreakerState::Open);
        let client = ResilientPricingClient::new(Arc::new(MockPricing { fail: false }), b);

        let result = client.calculate_fare(&request(TransportMode::Brt)).await;
        assert!(result.fallback_used);
        assert_eq!(result.final_amount, dec!(350));
        assert!(result.applied_discounts.is_empty());
    }

    #[tokio::test]
    async fn test_pricing_fallback_on_failure() {
        let client = ResilientPricingClient::new(Arc::new(MockPricing { fail: true }), breaker());

        let result = client.calculate_fare(&request(TransportMode::Ter)).await;
        assert!(result.fallback_used);
        assert_eq!(result.final_amount, dec!(500));
    }

    #[tokio::test]
    async fn test_pricing_failures_open_breaker() {
        let b = breaker();
        let client =
            ResilientPricingClient::new(Arc::new(MockPricing { fail: true }), Arc::clone(&b));

        for _ in 0..5 {
            client.calculate_fare(&request(TransportMode::Bus)).await;
        }
        assert_eq!(b.state(), BreakerState::Open);
    }

    #[tokio::test]
    async fn test_fallback_fares_per_mode() {
        let b = breaker();
        b.force_state(BreakerState::Open);
        let client = ResilientPricingClient::new(Arc::new(MockPricing { fail: false }), b);

        let bus = client.calculate_fare(&request(TransportMode::Bus)).await;
        assert_eq!(bus.final_amount, dec!(200));
    }

    #[tokio::test]
    async fn test_spend_known_when_closed() {
        let client = ResilientSpendClient::new(Arc::new(MockSpend { fail: false }), breaker());

        let total = client.daily_total(Uuid::new_v4()).await;
        assert_eq!(total, Some(dec!(1200)));
    }

    #[tokio::test]
    async fn test_spend_unknown_on_failure() {
        let client = ResilientSpendClient::new(Arc::new(MockSpend { fail: true }), breaker());

        let total = client.daily_total(Uuid::new_v4()).await;
        assert_eq!(total, None);
    }

    #[tokio::test]
    async fn test_spend_unknown_on_open_circuit() {
        let b = breaker();
        b.force_state(BreakerState::Open);
        let client = ResilientSpendClient::new(Arc::new(MockSpend { fail: false }), b);

        let total = client.daily_total(Uuid::new_v4()).await;
        assert_eq!(total, None);
    }
}

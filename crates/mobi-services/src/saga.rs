//! Trip payment saga
//!
//! Orchestrates one trip payment end to end: pass validation, trip creation,
//! resilient fare calculation, ledger debit and settlement, then best-effort
//! event emission. There is no compensation step: pricing cannot fail (the
//! fallback absorbs it) and a failed debit leaves the trip in the terminal
//! FAILED state with its audit trail intact.

use crate::constants::{LOW_BALANCE_THRESHOLD, MINIMUM_BALANCE};
use crate::resilience::ResilientPricingClient;
use chrono::{Local, NaiveDateTime};
use mobi_core::{
    models::{
        Pass, PricingFallbackEvent, PricingRequest, TransportMode, Trip, TripCompletedEvent,
        TripStatus,
    },
    traits::{EventPublisher, LedgerService, PassRepository, PricingService, TripRepository},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Everything the saga needs to pay for one trip
#[derive(Debug, Clone)]
pub struct TripOrder {
    pub transport_mode: TransportMode,
    pub origin: String,
    pub destination: String,
    pub distance_km: Decimal,
    /// Local wall-clock departure; defaults to now when absent
    pub departure_time: Option<NaiveDateTime>,
}

impl TripOrder {
    fn validate(&self) -> AppResult<()> {
        if self.distance_km <= Decimal::ZERO {
            return Err(AppError::Validation(
                "distance_km must be strictly positive".to_string(),
            ));
        }
        if self.origin.trim().is_empty() {
            return Err(AppError::Validation("origin must not be empty".to_string()));
        }
        if self.destination.trim().is_empty() {
            return Err(AppError::Validation(
                "destination must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trip payment orchestrator
pub struct TripPaymentSaga<P, T, PS, L, E>
where
    P: PassRepository,
    T: TripRepository,
    PS: PricingService,
    L: LedgerService,
    E: EventPublisher + 'static,
{
    pass_repo: Arc<P>,
    trip_repo: Arc<T>,
    pricing_client: Arc<ResilientPricingClient<PS>>,
    ledger: Arc<L>,
    events: Arc<E>,
}

impl<P, T, PS, L, E> TripPaymentSaga<P, T, PS, L, E>
where
    P: PassRepository,
    T: TripRepository,
    PS: PricingService,
    L: LedgerService,
    E: EventPublisher + 'static,
{
    /// Create a new saga
    pub fn new(
        pass_repo: Arc<P>,
        trip_repo: Arc<T>,
        pricing_client: Arc<ResilientPricingClient<PS>>,
        ledger: Arc<L>,
        events: Arc<E>,
    ) -> Self {
        Self {
            pass_repo,
            trip_repo,
            pricing_client,
            ledger,
            events,
        }
    }

    /// Validate the rider's pass before any trip state exists
    async fn validate_pass(&self, rider_id: Uuid) -> AppResult<Pass> {
        let pass = self
            .pass_repo
            .find_by_rider(rider_id)
            .await?
            .ok_or_else(|| AppError::PassNotFound(rider_id.to_string()))?;

        match pass.status {
            mobi_core::models::PassStatus::Active => {}
            mobi_core::models::PassStatus::Suspended => {
                return Err(AppError::PassSuspended(pass.id.to_string()));
            }
            mobi_core::models::PassStatus::Expired => {
                return Err(AppError::PassExpired(pass.id.to_string()));
            }
        }

        if !pass.can_start_trip(MINIMUM_BALANCE) {
            warn!(
                "Pass {} below minimum balance: {} < {}",
                pass.id, pass.balance, MINIMUM_BALANCE
            );
            return Err(AppError::InsufficientBalance {
                required: MINIMUM_BALANCE.to_string(),
                available: pass.balance.to_string(),
            });
        }

        Ok(pass)
    }

    /// Rider's lifetime trip count; a failed lookup degrades to zero so the
    /// loyalty discount is simply not granted
    async fn lifetime_trips(&self, rider_id: Uuid) -> i64 {
        match self.trip_repo.count_by_rider(rider_id).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Trip count lookup failed for rider {}: {}", rider_id, e);
                0
            }
        }
    }

    /// Emit completion events without blocking the response
    fn emit_events(&self, trip: &Trip, amount: Decimal, balance_after: Decimal, fallback_note: Option<String>) {
        let completed = TripCompletedEvent {
            trip_id: trip.id,
            rider_id: trip.rider_id,
            pass_id: trip.pass_id,
            amount,
            balance_after,
            transport_mode: trip.transport_mode,
            completed_at: chrono::Utc::now(),
        };

        let fallback = fallback_note.map(|reason| PricingFallbackEvent {
            trip_id: trip.id,
            pass_id: trip.pass_id,
            reason,
            fallback_amount: amount,
            transport_mode: trip.transport_mode,
            occurred_at: chrono::Utc::now(),
        });

        let events = Arc::clone(&self.events);
        tokio::spawn(async move {
            if let Err(e) = events.publish_trip_completed(&completed).await {
                warn!("Failed to publish trip_completed: {}", e);
            }
            if let Some(event) = fallback {
                if let Err(e) = events.publish_pricing_fallback(&event).await {
                    warn!("Failed to publish pricing_fallback: {}", e);
                }
            }
        });
    }

    /// Pay for one trip.
    ///
    /// Returns the settled trip (COMPLETED, or PENDING_PAYMENT when the
    /// fallback fare was used).
    #[instrument(skip(self, order), fields(mode = %order.transport_mode))]
    pub async fn initiate_trip(&self, rider_id: Uuid, order: TripOrder) -> AppResult<Trip> {
        order.validate()?;
        let pass = self.validate_pass(rider_id).await?;

        let departure = order
            .departure_time
            .unwrap_or_else(|| Local::now().naive_local());

        let trip = Trip::initiate(
            rider_id,
            pass.id,
            order.transport_mode,
            order.origin,
            order.destination,
            order.distance_km,
            departure,
        );
        let trip = self.trip_repo.create(&trip).await?;
        info!("Trip {} initiated for rider {}", trip.id, rider_id);

        let request = PricingRequest {
            trip_id: trip.id,
            transport_mode: trip.transport_mode,
            distance_km: trip.distance_km,
            departure_time: Some(trip.departure_time),
            pass_id: pass.id,
            tier: pass.tier,
            total_trips: self.lifetime_trips(rider_id).await,
        };

        let fare = self.pricing_client.calculate_fare(&request).await;
        info!(
            "Trip {} priced at {} (fallback: {})",
            trip.id, fare.final_amount, fare.fallback_used
        );

        let description = format!("Trip {} {} -> {}", trip.transport_mode, trip.origin, trip.destination);
        let outcome = match self
            .ledger
            .debit(pass.id, trip.id, fare.final_amount, &description)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Debit failed for trip {}: {}", trip.id, e);
                if let Err(settle_err) = self
                    .trip_repo
                    .settle(trip.id, TripStatus::Failed, Some(fare.final_amount), None)
                    .await
                {
                    error!("Failed to mark trip {} FAILED: {}", trip.id, settle_err);
                }
                return Err(e);
            }
        };

        let status = if fare.fallback_used {
            TripStatus::PendingPayment
        } else {
            TripStatus::Completed
        };

        let settled = self
            .trip_repo
            .settle(
                trip.id,
                status,
                Some(fare.final_amount),
                Some(Local::now().naive_local()),
            )
            .await?;

        if outcome.balance_after < LOW_BALANCE_THRESHOLD {
            warn!(
                "Pass {} balance low after trip {}: {} FCFA",
                pass.id, trip.id, outcome.balance_after
            );
        }

        let fallback_note = fare.fallback_used.then(|| fare.note.clone());
        self.emit_events(&settled, fare.final_amount, outcome.balance_after, fallback_note);

        Ok(settled)
    }

    /// Trip lookup
    pub async fn trip(&self, id: Uuid) -> AppResult<Trip> {
        self.trip_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::TripNotFound(id.to_string()))
    }

    /// All trips of a rider, newest first
    pub async fn trips_for_rider(&self, rider_id: Uuid) -> AppResult<Vec<Trip>> {
        self.trip_repo.list_by_rider(rider_id).await
    }

    /// All trips charged to a pass, newest first
    pub async fn trips_for_pass(&self, pass_id: Uuid) -> AppResult<Vec<Trip>> {
        self.trip_repo.list_by_pass(pass_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::{BreakerState, CircuitBreaker};
    use async_trait::async_trait;
    use chrono::Utc;
    use mobi_core::config::BreakerConfig;
    use mobi_core::models::{FareResult, PassStatus, PassTier};
    use mobi_core::traits::DebitOutcome;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    struct MockPassRepository {
        pass: Option<Pass>,
    }

    #[async_trait]
    impl PassRepository for MockPassRepository {
        async fn find_by_id(&self, _id: Uuid) -> AppResult<Option<Pass>> {
            Ok(self.pass.clone())
        }

        async fn find_by_rider(&self, _rider_id: Uuid) -> AppResult<Option<Pass>> {
            Ok(self.pass.clone())
        }

        async fn create(&self, pass: &Pass) -> AppResult<Pass> {
            Ok(pass.clone())
        }

        async fn set_status(&self, _id: Uuid, _status: PassStatus) -> AppResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockTripRepository {
        created: Mutex<Vec<Trip>>,
        settled: Mutex<Vec<(Uuid, TripStatus, Option<Decimal>)>>,
    }

    #[async_trait]
    impl TripRepository for MockTripRepository {
        async fn create(&self, trip: &Trip) -> AppResult<Trip> {
            self.created.lock().push(trip.clone());
            Ok(trip.clone())
        }

        async fn settle(
            &self,
            id: Uuid,
            status: TripStatus,
            computed_fare: Option<Decimal>,
            arrival_time: Option<NaiveDateTime>,
        ) -> AppResult<Trip> {
            self.settled.lock().push((id, status, computed_fare));
            let mut trip = self
                .created
                .lock()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| AppError::TripNotFound(id.to_string()))?;
            trip.status = status;
            trip.computed_fare = computed_fare;
            trip.arrival_time = arrival_time;
            Ok(trip)
        }

        async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Trip>> {
            Ok(self.created.lock().iter().find(|t| t.id == id).cloned())
        }

        async fn list_by_rider(&self, _rider_id: Uuid) -> AppResult<Vec<Trip>> {
            Ok(self.created.lock().clone())
        }

        async fn list_by_pass(&self, _pass_id: Uuid) -> AppResult<Vec<Trip>> {
            Ok(self.created.lock().clone())
        }

        async fn count_by_rider(&self, _rider_id: Uuid) -> AppResult<i64> {
            Ok(3)
        }
    }

    struct MockPricing {
        result: FareResult,
    }

    #[async_trait]
    impl PricingService for MockPricing {
        async fn calculate_fare(&self, _request: &PricingRequest) -> AppResult<FareResult> {
            Ok(self.result.clone())
        }
    }

    struct MockLedger {
        fail: bool,
        debits: Mutex<Vec<Decimal>>,
    }

    #[async_trait]
    impl LedgerService for MockLedger {
        async fn debit(
            &self,
            _pass_id: Uuid,
            _trip_id: Uuid,
            amount: Decimal,
            _description: &str,
        ) -> AppResult<DebitOutcome> {
            if self.fail {
                return Err(AppError::InsufficientBalance {
                    required: amount.to_string(),
                    available: "0".to_string(),
                });
            }
            self.debits.lock().push(amount);
            Ok(DebitOutcome {
                transaction_id: Uuid::new_v4(),
                balance_after: dec!(600),
            })
        }

        async fn credit(
            &self,
            _pass_id: Uuid,
            _amount: Decimal,
            _description: &str,
        ) -> AppResult<DebitOutcome> {
            Ok(DebitOutcome {
                transaction_id: Uuid::new_v4(),
                balance_after: dec!(1000),
            })
        }

        async fn daily_total(&self, _pass_id: Uuid) -> AppResult<Decimal> {
            Ok(Decimal::ZERO)
        }

        async fn history(&self, _pass_id: Uuid) -> AppResult<Vec<mobi_core::models::LedgerTransaction>> {
            Ok(vec![])
        }

        async fn transaction(&self, id: Uuid) -> AppResult<mobi_core::models::LedgerTransaction> {
            Err(AppError::TransactionNotFound(id.to_string()))
        }

        async fn daily_stats(&self) -> AppResult<mobi_core::models::DailyLedgerStats> {
            Ok(mobi_core::models::DailyLedgerStats::default())
        }
    }

    struct NoopEvents;

    #[async_trait]
    impl EventPublisher for NoopEvents {
        async fn publish_trip_completed(&self, _event: &TripCompletedEvent) -> AppResult<()> {
            Ok(())
        }

        async fn publish_pricing_fallback(&self, _event: &PricingFallbackEvent) -> AppResult<()> {
            Ok(())
        }
    }

    fn active_pass(balance: Decimal) -> Pass {
        Pass {
            balance,
            ..Pass::default()
        }
    }

    fn normal_fare(amount: Decimal) -> FareResult {
        FareResult {
            base_amount: amount,
            discount_amount: dec!(0),
            final_amount: amount,
            applied_discounts: vec![],
            capped_by_daily_limit: false,
            fallback_used: false,
            note: "Standard fare".to_string(),
        }
    }

    fn order() -> TripOrder {
        TripOrder {
            transport_mode: TransportMode::Bus,
            origin: "Liberté 6".to_string(),
            destination: "Plateau".to_string(),
            distance_km: dec!(10),
            departure_time: None,
        }
    }

    fn saga(
        pass: Option<Pass>,
        fare: FareResult,
        ledger_fails: bool,
        breaker_state: Option<BreakerState>,
    ) -> (
        TripPaymentSaga<MockPassRepository, MockTripRepository, MockPricing, MockLedger, NoopEvents>,
        Arc<MockTripRepository>,
        Arc<MockLedger>,
    ) {
        let trip_repo = Arc::new(MockTripRepository::default());
        let ledger = Arc::new(MockLedger {
            fail: ledger_fails,
            debits: Mutex::new(vec![]),
        });
        let breaker = Arc::new(CircuitBreaker::new("pricing", &BreakerConfig::default()));
        if let Some(state) = breaker_state {
            breaker.force_state(state);
        }
        let pricing_client = Arc::new(ResilientPricingClient::new(
            Arc::new(MockPricing { result: fare }),
            breaker,
        ));

        let saga = TripPaymentSaga::new(
            Arc::new(MockPassRepository { pass }),
            Arc::clone(&trip_repo),
            pricing_client,
            Arc::clone(&ledger),
            Arc::new(NoopEvents),
        );
        (saga, trip_repo, ledger)
    }

    #[tokio::test]
    async fn test_successful_trip_completes() {
        let (saga, trips, ledger) = saga(
            Some(active_pass(dec!(1000))),
            normal_fare(dec!(400)),
            false,
            None,
        );

        let trip = saga.initiate_trip(Uuid::new_v4(), order()).await.unwrap();
        assert_eq!(trip.status, TripStatus::Completed);
        assert_eq!(trip.computed_fare, Some(dec!(400)));
        assert!(trip.arrival_time.is_some());
        assert_eq!(ledger.debits.lock().as_slice(), &[dec!(400)]);
        assert_eq!(trips.created.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_distance_before_any_state() {
        let (saga, trips, _) = saga(
            Some(active_pass(dec!(1000))),
            normal_fare(dec!(400)),
            false,
            None,
        );

        let mut bad = order();
        bad.distance_km = dec!(0);
        let err = saga.initiate_trip(Uuid::new_v4(), bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(trips.created.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_below_minimum_balance_before_trip_row() {
        let (saga, trips, _) = saga(
            Some(active_pass(dec!(50))),
            normal_fare(dec!(400)),
            false,
            None,
        );

        let err = saga.initiate_trip(Uuid::new_v4(), order()).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance { .. }));
        assert!(trips.created.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_suspended_pass() {
        let mut pass = active_pass(dec!(1000));
        pass.status = PassStatus::Suspended;
        let (saga, trips, _) = saga(Some(pass), normal_fare(dec!(400)), false, None);

        let err = saga.initiate_trip(Uuid::new_v4(), order()).await.unwrap_err();
        assert!(matches!(err, AppError::PassSuspended(_)));
        assert!(trips.created.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_pass() {
        let (saga, _, _) = saga(None, normal_fare(dec!(400)), false, None);

        let err = saga.initiate_trip(Uuid::new_v4(), order()).await.unwrap_err();
        assert!(matches!(err, AppError::PassNotFound(_)));
    }

    #[tokio::test]
    async fn test_open_circuit_uses_fallback_and_pends_payment() {
        let (saga, _, ledger) = saga(
            Some(active_pass(dec!(1000))),
            normal_fare(dec!(400)),
            false,
            Some(BreakerState::Open),
        );

        let trip = saga.initiate_trip(Uuid::new_v4(), order()).await.unwrap();
        assert_eq!(trip.status, TripStatus::PendingPayment);
        // BUS flat fallback fare
        assert_eq!(trip.computed_fare, Some(dec!(200)));
        assert_eq!(ledger.debits.lock().as_slice(), &[dec!(200)]);
    }

    #[tokio::test]
    async fn test_debit_failure_marks_trip_failed() {
        let (saga, trips, _) = saga(
            Some(active_pass(dec!(1000))),
            normal_fare(dec!(400)),
            true,
            None,
        );

        let err = saga.initiate_trip(Uuid::new_v4(), order()).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance { .. }));

        let settled = trips.settled.lock();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].1, TripStatus::Failed);
        assert_eq!(settled[0].2, Some(dec!(400)));
    }

    #[tokio::test]
    async fn test_gold_loyalty_fare_flows_through() {
        // base 400, GOLD -15% -> 340, loyalty -5% -> 323
        let fare = FareResult {
            base_amount: dec!(400),
            discount_amount: dec!(77),
            final_amount: dec!(323),
            applied_discounts: vec!["GOLD tier -15%".to_string(), "Loyalty -5%".to_string()],
            capped_by_daily_limit: false,
            fallback_used: false,
            note: "2 discount(s) applied".to_string(),
        };
        let (saga, _, ledger) = saga(Some(active_pass(dec!(1000))), fare, false, None);

        let trip = saga.initiate_trip(Uuid::new_v4(), order()).await.unwrap();
        assert_eq!(trip.status, TripStatus::Completed);
        assert_eq!(trip.computed_fare, Some(dec!(323)));
        assert_eq!(ledger.debits.lock().as_slice(), &[dec!(323)]);
    }

    #[tokio::test]
    async fn test_trip_lookup_not_found() {
        let (saga, _, _) = saga(
            Some(active_pass(dec!(1000))),
            normal_fare(dec!(400)),
            false,
            None,
        );

        let err = saga.trip(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::TripNotFound(_)));
    }

    #[test]
    fn test_pass_default_is_usable() {
        let pass = active_pass(dec!(500));
        assert!(pass.is_active());
        assert!(pass.expiration_date > Utc::now());
    }
}

//! HTTP request handlers
//!
//! Handlers construct repositories and services from the shared pool per
//! request; only the circuit breakers are long-lived shared state.

pub mod billing;
pub mod pricing;
pub mod trip;

pub use billing::configure as configure_billing;
pub use pricing::configure as configure_pricing;
pub use trip::configure as configure_trips;

use crate::state::Breakers;
use mobi_cache::RedisCache;
use mobi_core::AppConfig;
use mobi_db::{
    PgDiscountPolicyRepository, PgFareCalculationRepository, PgFareRuleRepository,
    PgLedgerRepository, PgPassRepository, PgTripRepository,
};
use mobi_services::{
    LedgerServiceImpl, PricingServiceImpl, RedisEventPublisher, ResilientPricingClient,
    ResilientSpendClient, TripPaymentSaga,
};
use sqlx::PgPool;
use std::sync::Arc;

pub(crate) type Ledger = LedgerServiceImpl<PgLedgerRepository>;
pub(crate) type Pricing = PricingServiceImpl<
    PgFareRuleRepository,
    PgDiscountPolicyRepository,
    PgFareCalculationRepository,
    Ledger,
>;
pub(crate) type Saga =
    TripPaymentSaga<PgPassRepository, PgTripRepository, Pricing, Ledger, RedisEventPublisher>;

/// Ledger service over the shared pool
pub(crate) fn build_ledger(pool: &PgPool) -> Arc<Ledger> {
    Arc::new(LedgerServiceImpl::new(
        Arc::new(PgLedgerRepository::new(pool.clone())),
        Arc::new(pool.clone()),
    ))
}

/// Pricing service with its resilient daily-spend client
pub(crate) fn build_pricing(
    pool: &PgPool,
    cache: &RedisCache,
    config: &AppConfig,
    breakers: &Breakers,
) -> Arc<Pricing> {
    let spend_client = Arc::new(ResilientSpendClient::new(
        build_ledger(pool),
        Arc::clone(&breakers.spend),
    ));

    Arc::new(PricingServiceImpl::new(
        Arc::new(PgFareRuleRepository::new(pool.clone())),
        Arc::new(PgDiscountPolicyRepository::new(pool.clone())),
        Arc::new(PgFareCalculationRepository::new(pool.clone())),
        spend_client,
        Arc::new(cache.clone()),
        config.pricing.clone(),
    ))
}

/// Full trip payment saga
pub(crate) fn build_saga(
    pool: &PgPool,
    cache: &RedisCache,
    config: &AppConfig,
    breakers: &Breakers,
) -> Saga {
    let pricing_client = Arc::new(ResilientPricingClient::new(
        build_pricing(pool, cache, config, breakers),
        Arc::clone(&breakers.pricing),
    ));

    TripPaymentSaga::new(
        Arc::new(PgPassRepository::new(pool.clone())),
        Arc::new(PgTripRepository::new(pool.clone())),
        pricing_client,
        build_ledger(pool),
        Arc::new(RedisEventPublisher::new(Arc::new(cache.clone()))),
    )
}

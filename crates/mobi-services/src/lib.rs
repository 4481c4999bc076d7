//! Business logic services for MobiPass
//!
//! This crate contains the business logic that orchestrates trip payment,
//! including fare calculation, resilient pricing, ledger debits and the
//! trip payment saga.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies (repositories, cache, etc.)
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - All operations are instrumented with tracing
//! - Comprehensive error handling with AppError
//!
//! # Services
//!
//! - `fare_engine` - Pure fare calculation (base price, discounts, daily cap)
//! - `PricingServiceImpl` - Rule lookup with caching + fare audit trail
//! - `CircuitBreaker` - Explicit breaker state for outbound call sites
//! - `ResilientPricingClient` / `ResilientSpendClient` - Breaker-guarded
//!   wrappers with static fallbacks
//! - `LedgerServiceImpl` - Transactional balance debit/credit with row locking
//! - `TripPaymentSaga` - Trip payment orchestration
//! - `RedisEventPublisher` - Best-effort domain event emission

pub mod breaker;
pub mod events;
pub mod fare_engine;
pub mod ledger;
pub mod pricing;
pub mod resilience;
pub mod saga;

pub use breaker::{BreakerState, CircuitBreaker};
pub use events::RedisEventPublisher;
pub use fare_engine::{calculate, DiscountSchedule, FareInput};
pub use ledger::LedgerServiceImpl;
pub use pricing::PricingServiceImpl;
pub use resilience::{ResilientPricingClient, ResilientSpendClient};
pub use saga::TripPaymentSaga;

/// Business logic constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Minimum balance required before a trip may start (FCFA)
    pub const MINIMUM_BALANCE: Decimal = dec!(100);

    /// Balance below which a low-balance warning is logged after debit (FCFA)
    pub const LOW_BALANCE_THRESHOLD: Decimal = dec!(500);

    /// Flat fallback fare per transport mode when pricing is unavailable (FCFA)
    pub const FALLBACK_FARE_BUS: Decimal = dec!(200);
    pub const FALLBACK_FARE_BRT: Decimal = dec!(350);
    pub const FALLBACK_FARE_TER: Decimal = dec!(500);
}

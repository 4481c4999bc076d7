//! Domain models for MobiPass
//!
//! This module contains all the core domain models used throughout the application.

pub mod events;
pub mod fare;
pub mod ledger;
pub mod pass;
pub mod trip;

pub use events::{PricingFallbackEvent, TripCompletedEvent};
pub use fare::{
    round_money, DiscountKind, DiscountPolicy, FareCalculation, FareResult, FareRule,
    PricingRequest,
};
pub use ledger::{DailyLedgerStats, LedgerTransaction, TransactionKind, TransactionStatus};
pub use pass::{Pass, PassStatus, PassTier};
pub use trip::{TransportMode, Trip, TripStatus};

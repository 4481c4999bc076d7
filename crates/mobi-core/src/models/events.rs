//! Async event payloads
//!
//! Emitted best-effort after a trip settles; consumed by the notification
//! service. Delivery is never allowed to affect the financial outcome.

use crate::models::trip::TransportMode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Published when a trip has been priced and debited
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripCompletedEvent {
    pub trip_id: Uuid,
    pub rider_id: Uuid,
    pub pass_id: Uuid,
    /// Amount debited in FCFA
    pub amount: Decimal,
    /// Pass balance after the debit
    pub balance_after: Decimal,
    pub transport_mode: TransportMode,
    pub completed_at: DateTime<Utc>,
}

/// Published when the pricing circuit was open and a flat fallback fare
/// was charged instead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingFallbackEvent {
    pub trip_id: Uuid,
    pub pass_id: Uuid,
    /// Why the fallback fired (e.g. "pricing circuit open")
    pub reason: String,
    pub fallback_amount: Decimal,
    pub transport_mode: TransportMode,
    pub occurred_at: DateTime<Utc>,
}

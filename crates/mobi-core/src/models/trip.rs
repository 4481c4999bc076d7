//! Trip model
//!
//! A trip is created by the payment saga once the pass has been validated,
//! and settles into a terminal state when pricing and billing finish.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Transport mode of a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportMode {
    /// Classic city bus
    Bus,
    /// Bus rapid transit
    Brt,
    /// Regional express train
    Ter,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Bus => write!(f, "BUS"),
            TransportMode::Brt => write!(f, "BRT"),
            TransportMode::Ter => write!(f, "TER"),
        }
    }
}

impl TransportMode {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUS" => Some(TransportMode::Bus),
            "BRT" => Some(TransportMode::Brt),
            "TER" => Some(TransportMode::Ter),
            _ => None,
        }
    }

    /// All known modes, for building lookup tables
    pub fn all() -> [TransportMode; 3] {
        [TransportMode::Bus, TransportMode::Brt, TransportMode::Ter]
    }
}

/// Trip lifecycle status
///
/// Transitions are forward-only: INITIATED is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    /// Trip row persisted, not yet priced or billed
    Initiated,
    /// Priced normally and debited
    Completed,
    /// Debited against a fallback flat fare; eligible for later re-pricing
    PendingPayment,
    /// Debit failed after pricing; terminal, never billed
    Failed,
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripStatus::Initiated => write!(f, "INITIATED"),
            TripStatus::Completed => write!(f, "COMPLETED"),
            TripStatus::PendingPayment => write!(f, "PENDING_PAYMENT"),
            TripStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl TripStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INITIATED" => Some(TripStatus::Initiated),
            "COMPLETED" => Some(TripStatus::Completed),
            "PENDING_PAYMENT" => Some(TripStatus::PendingPayment),
            "FAILED" => Some(TripStatus::Failed),
            _ => None,
        }
    }

    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TripStatus::Initiated)
    }

    /// Status may only advance forward, never regress
    pub fn can_transition_to(&self, next: TripStatus) -> bool {
        matches!(
            (self, next),
            (
                TripStatus::Initiated,
                TripStatus::Completed | TripStatus::PendingPayment | TripStatus::Failed
            )
        )
    }
}

/// Trip entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    /// Unique identifier
    pub id: Uuid,

    /// Rider who took the trip
    pub rider_id: Uuid,

    /// Pass charged for the trip
    pub pass_id: Uuid,

    /// Transport mode
    pub transport_mode: TransportMode,

    /// Departure stop/station
    pub origin: String,

    /// Arrival stop/station
    pub destination: String,

    /// Distance travelled in kilometers, strictly positive
    pub distance_km: Decimal,

    /// Departure wall-clock time (local)
    pub departure_time: NaiveDateTime,

    /// Arrival time, set when the trip settles
    pub arrival_time: Option<NaiveDateTime>,

    /// Lifecycle status
    pub status: TripStatus,

    /// Final fare charged, set after pricing
    pub computed_fare: Option<Decimal>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Build a fresh INITIATED trip for the saga
    pub fn initiate(
        rider_id: Uuid,
        pass_id: Uuid,
        transport_mode: TransportMode,
        origin: String,
        destination: String,
        distance_km: Decimal,
        departure_time: NaiveDateTime,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            rider_id,
            pass_id,
            transport_mode,
            origin,
            destination,
            distance_km,
            departure_time,
            arrival_time: None,
            status: TripStatus::Initiated,
            computed_fare: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_trip() -> Trip {
        Trip::initiate(
            Uuid::new_v4(),
            Uuid::new_v4(),
            TransportMode::Bus,
            "Liberté 6".to_string(),
            "Plateau".to_string(),
            dec!(10),
            chrono::Utc::now().naive_local(),
        )
    }

    #[test]
    fn test_initiate_defaults() {
        let trip = sample_trip();
        assert_eq!(trip.status, TripStatus::Initiated);
        assert!(trip.computed_fare.is_none());
        assert!(trip.arrival_time.is_none());
    }

    #[test]
    fn test_status_forward_only() {
        assert!(TripStatus::Initiated.can_transition_to(TripStatus::Completed));
        assert!(TripStatus::Initiated.can_transition_to(TripStatus::PendingPayment));
        assert!(TripStatus::Initiated.can_transition_to(TripStatus::Failed));

        assert!(!TripStatus::Completed.can_transition_to(TripStatus::Initiated));
        assert!(!TripStatus::PendingPayment.can_transition_to(TripStatus::Completed));
        assert!(!TripStatus::Failed.can_transition_to(TripStatus::Completed));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TripStatus::Initiated.is_terminal());
        assert!(TripStatus::Completed.is_terminal());
        assert!(TripStatus::PendingPayment.is_terminal());
        assert!(TripStatus::Failed.is_terminal());
    }

    #[test]
    fn test_transport_mode_round_trip() {
        for mode in TransportMode::all() {
            assert_eq!(TransportMode::from_str(&mode.to_string()), Some(mode));
        }
        assert_eq!(TransportMode::from_str("tramway"), None);
    }
}

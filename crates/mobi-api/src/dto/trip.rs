//! Trip DTOs

use chrono::NaiveDateTime;
use mobi_core::models::{TransportMode, Trip, TripStatus};
use mobi_core::AppError;
use mobi_services::saga::TripOrder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request body for POST /trips
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TripCreateRequest {
    /// Transport mode: BUS, BRT or TER
    #[validate(length(min = 1))]
    pub transport_mode: String,

    /// Departure stop/station
    #[validate(length(min = 1, max = 200))]
    pub origin: String,

    /// Arrival stop/station
    #[validate(length(min = 1, max = 200))]
    pub destination: String,

    /// Distance travelled in kilometers, strictly positive
    pub distance_km: Decimal,

    /// Local wall-clock departure; defaults to now when absent
    pub departure_time: Option<NaiveDateTime>,
}

impl TripCreateRequest {
    /// Convert into a saga order, resolving the transport mode
    pub fn into_order(self) -> Result<TripOrder, AppError> {
        let transport_mode = TransportMode::from_str(&self.transport_mode).ok_or_else(|| {
            AppError::InvalidInput(format!("Unknown transport mode: {}", self.transport_mode))
        })?;

        Ok(TripOrder {
            transport_mode,
            origin: self.origin,
            destination: self.destination,
            distance_km: self.distance_km,
            departure_time: self.departure_time,
        })
    }
}

/// Trip representation returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct TripResponse {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub pass_id: Uuid,
    pub transport_mode: TransportMode,
    pub origin: String,
    pub destination: String,
    pub distance_km: Decimal,
    pub departure_time: NaiveDateTime,
    pub arrival_time: Option<NaiveDateTime>,
    pub status: TripStatus,
    pub computed_fare: Option<Decimal>,
}

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        Self {
            id: trip.id,
            rider_id: trip.rider_id,
            pass_id: trip.pass_id,
            transport_mode: trip.transport_mode,
            origin: trip.origin,
            destination: trip.destination,
            distance_km: trip.distance_km,
            departure_time: trip.departure_time,
            arrival_time: trip.arrival_time,
            status: trip.status,
            computed_fare: trip.computed_fare,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(mode: &str) -> TripCreateRequest {
        TripCreateRequest {
            transport_mode: mode.to_string(),
            origin: "Liberté 6".to_string(),
            destination: "Plateau".to_string(),
            distance_km: dec!(10),
            departure_time: None,
        }
    }

    #[test]
    fn test_into_order_resolves_mode() {
        let order = request("brt").into_order().unwrap();
        assert_eq!(order.transport_mode, TransportMode::Brt);
    }

    #[test]
    fn test_into_order_rejects_unknown_mode() {
        let err = request("TRAM").into_order().unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}

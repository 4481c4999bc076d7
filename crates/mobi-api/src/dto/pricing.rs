//! Pricing DTOs

use chrono::{DateTime, NaiveDateTime, Utc};
use mobi_core::models::{
    FareCalculation, FareResult, FareRule, PassTier, PricingRequest, TransportMode,
};
use mobi_core::AppError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request body for POST /pricing/calculate
///
/// Ad-hoc quotes (no trip yet) may omit `trip_id`; the audit row is then
/// keyed by a fresh id.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CalculateFareRequest {
    pub trip_id: Option<Uuid>,

    /// Transport mode: BUS, BRT or TER
    #[validate(length(min = 1))]
    pub transport_mode: String,

    /// Distance in kilometers, strictly positive
    pub distance_km: Decimal,

    /// Local wall-clock departure; absent skips the off-peak discount
    pub departure_time: Option<NaiveDateTime>,

    pub pass_id: Uuid,

    /// Discount tier; defaults to STANDARD
    pub tier: Option<PassTier>,

    /// Rider's lifetime trip count; defaults to 0
    pub total_trips: Option<i64>,
}

impl CalculateFareRequest {
    /// Convert into a pricing request, resolving the transport mode
    pub fn into_pricing_request(self) -> Result<PricingRequest, AppError> {
        if self.distance_km <= Decimal::ZERO {
            return Err(AppError::Validation(
                "distance_km must be strictly positive".to_string(),
            ));
        }

        let transport_mode = TransportMode::from_str(&self.transport_mode).ok_or_else(|| {
            AppError::InvalidInput(format!("Unknown transport mode: {}", self.transport_mode))
        })?;

        Ok(PricingRequest {
            trip_id: self.trip_id.unwrap_or_else(Uuid::new_v4),
            transport_mode,
            distance_km: self.distance_km,
            departure_time: self.departure_time,
            pass_id: self.pass_id,
            tier: self.tier.unwrap_or(PassTier::Standard),
            total_trips: self.total_trips.unwrap_or(0),
        })
    }
}

/// Priced fare as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct FareResponse {
    pub base_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub applied_discounts: Vec<String>,
    pub capped_by_daily_limit: bool,
    pub fallback_used: bool,
    pub note: String,
}

impl From<FareResult> for FareResponse {
    fn from(result: FareResult) -> Self {
        Self {
            base_amount: result.base_amount,
            discount_amount: result.discount_amount,
            final_amount: result.final_amount,
            applied_discounts: result.applied_discounts,
            capped_by_daily_limit: result.capped_by_daily_limit,
            fallback_used: result.fallback_used,
            note: result.note,
        }
    }
}

/// Fare rule as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct FareRuleResponse {
    pub id: i32,
    pub transport_mode: TransportMode,
    pub base_price: Decimal,
    pub price_per_km: Decimal,
    pub off_peak_discount_pct: Decimal,
    pub daily_cap_amount: Option<Decimal>,
    pub active: bool,
}

impl From<FareRule> for FareRuleResponse {
    fn from(rule: FareRule) -> Self {
        Self {
            id: rule.id,
            transport_mode: rule.transport_mode,
            base_price: rule.base_price,
            price_per_km: rule.price_per_km,
            off_peak_discount_pct: rule.off_peak_discount_pct,
            daily_cap_amount: rule.daily_cap_amount,
            active: rule.active,
        }
    }
}

/// Fare calculation audit row as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct FareCalculationResponse {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub pass_id: Uuid,
    pub base_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub applied_discounts: Vec<String>,
    pub capped_by_daily_limit: bool,
    pub fallback_used: bool,
    pub calculated_at: DateTime<Utc>,
}

impl From<FareCalculation> for FareCalculationResponse {
    fn from(calc: FareCalculation) -> Self {
        Self {
            id: calc.id,
            trip_id: calc.trip_id,
            pass_id: calc.pass_id,
            base_amount: calc.base_amount,
            discount_amount: calc.discount_amount,
            final_amount: calc.final_amount,
            applied_discounts: calc.applied_discounts,
            capped_by_daily_limit: calc.capped_by_daily_limit,
            fallback_used: calc.fallback_used,
            calculated_at: calc.calculated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_into_pricing_request_defaults() {
        let req = CalculateFareRequest {
            trip_id: None,
            transport_mode: "bus".to_string(),
            distance_km: dec!(5),
            departure_time: None,
            pass_id: Uuid::new_v4(),
            tier: None,
            total_trips: None,
        };

        let pricing = req.into_pricing_request().unwrap();
        assert_eq!(pricing.transport_mode, TransportMode::Bus);
        assert_eq!(pricing.tier, PassTier::Standard);
        assert_eq!(pricing.total_trips, 0);
    }

    #[test]
    fn test_rejects_non_positive_distance() {
        let req = CalculateFareRequest {
            trip_id: None,
            transport_mode: "BUS".to_string(),
            distance_km: dec!(-1),
            departure_time: None,
            pass_id: Uuid::new_v4(),
            tier: None,
            total_trips: None,
        };

        assert!(req.into_pricing_request().is_err());
    }
}

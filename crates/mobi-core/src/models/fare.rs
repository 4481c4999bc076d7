//! Fare pricing models
//!
//! Pricing rules, discount policies, the pricing request/result contract,
//! and the per-trip calculation audit row.

use crate::models::pass::PassTier;
use crate::models::trip::TransportMode;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Round a monetary amount to 2 decimal places, half-up
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Active pricing rule for one transport mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareRule {
    /// Unique identifier
    pub id: i32,

    /// Transport mode this rule prices (unique among active rules)
    pub transport_mode: TransportMode,

    /// Flat component of the fare in FCFA
    pub base_price: Decimal,

    /// Per-kilometer component in FCFA
    pub price_per_km: Decimal,

    /// Off-peak discount percentage for this mode
    pub off_peak_discount_pct: Decimal,

    /// Per-mode daily cap override; `None` falls back to the global cap
    pub daily_cap_amount: Option<Decimal>,

    /// Only active rules are consulted
    pub active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl FareRule {
    /// base_price + price_per_km * distance, rounded to 2dp half-up
    pub fn base_fare(&self, distance_km: Decimal) -> Decimal {
        round_money(self.base_price + self.price_per_km * distance_km)
    }

    /// Hard-coded default rule used when no active rule exists for a mode
    pub fn default_for(mode: TransportMode) -> Self {
        let (base_price, price_per_km) = match mode {
            TransportMode::Bus => (Decimal::from(150), Decimal::from(25)),
            TransportMode::Brt => (Decimal::from(200), Decimal::from(35)),
            TransportMode::Ter => (Decimal::from(300), Decimal::from(50)),
        };

        let now = Utc::now();
        Self {
            id: 0,
            transport_mode: mode,
            base_price,
            price_per_km,
            off_peak_discount_pct: Decimal::from(20),
            daily_cap_amount: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Discount policy kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Percentage,
    OffPeak,
    Loyalty,
    DailyCap,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountKind::Percentage => write!(f, "PERCENTAGE"),
            DiscountKind::OffPeak => write!(f, "OFF_PEAK"),
            DiscountKind::Loyalty => write!(f, "LOYALTY"),
            DiscountKind::DailyCap => write!(f, "DAILY_CAP"),
        }
    }
}

impl DiscountKind {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PERCENTAGE" => Some(DiscountKind::Percentage),
            "OFF_PEAK" => Some(DiscountKind::OffPeak),
            "LOYALTY" => Some(DiscountKind::Loyalty),
            "DAILY_CAP" => Some(DiscountKind::DailyCap),
            _ => None,
        }
    }
}

/// Administered discount policy, read-only input to the fare engine.
///
/// Active rows override the configured default value for the matching
/// calculation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Unique identifier
    pub id: i32,

    /// Human-readable policy name
    pub name: String,

    /// Which calculation step this policy parametrizes
    pub kind: DiscountKind,

    /// Percentage for discount kinds, amount for DAILY_CAP
    pub value: Decimal,

    /// Minimum lifetime trips required (loyalty)
    pub min_trips_required: Option<i64>,

    /// Tier restriction; `None` applies to all tiers
    pub applicable_tier: Option<PassTier>,

    /// Only active policies are consulted
    pub active: bool,
}

/// Pricing request: everything the fare engine needs about one trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRequest {
    pub trip_id: Uuid,
    pub transport_mode: TransportMode,
    pub distance_km: Decimal,
    /// Local wall-clock departure; `None` skips the off-peak step
    pub departure_time: Option<NaiveDateTime>,
    pub pass_id: Uuid,
    pub tier: PassTier,
    /// Rider's lifetime trip count, for the loyalty discount
    pub total_trips: i64,
}

/// Priced trip result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareResult {
    /// Undiscounted fare
    pub base_amount: Decimal,

    /// base_amount - final_amount, floored at zero
    pub discount_amount: Decimal,

    /// Amount actually debited, >= 0
    pub final_amount: Decimal,

    /// Ordered human-readable labels of the discounts applied
    pub applied_discounts: Vec<String>,

    /// Whether the daily cap clipped the amount
    pub capped_by_daily_limit: bool,

    /// Whether the static fallback table produced this result
    pub fallback_used: bool,

    /// Explanatory note for the rider
    pub note: String,
}

/// Per-trip calculation audit row, upserted by trip id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareCalculation {
    /// Unique identifier
    pub id: Uuid,

    /// Trip this calculation priced (unique)
    pub trip_id: Uuid,

    /// Pass the trip was charged to
    pub pass_id: Uuid,

    pub base_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,

    /// Ordered discount labels
    pub applied_discounts: Vec<String>,

    pub capped_by_daily_limit: bool,
    pub fallback_used: bool,

    /// When the calculation ran
    pub calculated_at: DateTime<Utc>,
}

impl FareCalculation {
    /// Build an audit row from a pricing result
    pub fn from_result(trip_id: Uuid, pass_id: Uuid, result: &FareResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            pass_id,
            base_amount: result.base_amount,
            discount_amount: result.discount_amount,
            final_amount: result.final_amount,
            applied_discounts: result.applied_discounts.clone(),
            capped_by_daily_limit: result.capped_by_daily_limit,
            fallback_used: result.fallback_used,
            calculated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
        assert_eq!(round_money(dec!(323)), dec!(323));
    }

    #[test]
    fn test_base_fare() {
        let rule = FareRule::default_for(TransportMode::Bus);
        // 150 + 25 * 10
        assert_eq!(rule.base_fare(dec!(10)), dec!(400.00));
    }

    #[test]
    fn test_default_rules_per_mode() {
        let brt = FareRule::default_for(TransportMode::Brt);
        assert_eq!(brt.base_price, dec!(200));
        assert_eq!(brt.price_per_km, dec!(35));

        let ter = FareRule::default_for(TransportMode::Ter);
        assert_eq!(ter.base_price, dec!(300));
        assert_eq!(ter.price_per_km, dec!(50));
    }

    #[test]
    fn test_discount_kind_round_trip() {
        for kind in [
            DiscountKind::Percentage,
            DiscountKind::OffPeak,
            DiscountKind::Loyalty,
            DiscountKind::DailyCap,
        ] {
            assert_eq!(DiscountKind::from_str(&kind.to_string()), Some(kind));
        }
    }
}

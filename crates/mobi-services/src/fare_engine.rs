//! Fare calculation engine
//!
//! Pure fare arithmetic: base price, stacked discounts and the daily cap.
//! The engine never touches a database or the network; every input arrives
//! resolved, which keeps recalculation deterministic for a given trip.
//!
//! Discounts apply in a fixed order, each to the running amount:
//! base -> off-peak -> tier -> loyalty -> daily cap.

use chrono::{NaiveDateTime, Timelike};
use mobi_core::models::{round_money, FareResult, FareRule, PassTier};
use rust_decimal::Decimal;

/// Resolved discount parameters for one calculation.
///
/// Built by the pricing service from config defaults overridden by
/// active `DiscountPolicy` rows.
#[derive(Debug, Clone)]
pub struct DiscountSchedule {
    /// Hour (0-23) at which the off-peak window opens
    pub off_peak_start_hour: u32,

    /// Hour (0-23) at which the off-peak window closes
    pub off_peak_end_hour: u32,

    /// Off-peak discount percentage
    pub off_peak_pct: Decimal,

    /// Lifetime trips required for the loyalty discount
    pub loyalty_trips_required: i64,

    /// Loyalty discount percentage
    pub loyalty_pct: Decimal,

    /// Daily spending cap in FCFA
    pub daily_cap: Decimal,
}

impl DiscountSchedule {
    /// Whether a local departure time falls in the off-peak window.
    ///
    /// The window wraps midnight: hour >= start or hour < end.
    pub fn is_off_peak(&self, departure: NaiveDateTime) -> bool {
        let hour = departure.hour();
        hour >= self.off_peak_start_hour || hour < self.off_peak_end_hour
    }
}

/// Everything the engine needs about one trip
#[derive(Debug, Clone)]
pub struct FareInput {
    pub distance_km: Decimal,

    /// Local wall-clock departure; `None` skips the off-peak step
    pub departure_time: Option<NaiveDateTime>,

    pub tier: PassTier,

    /// Rider's lifetime trip count
    pub total_trips: i64,

    /// Today's successful debit total; `None` means unknown and skips the cap
    pub daily_spend: Option<Decimal>,
}

/// Subtract `pct`% from `amount`; the discount itself is rounded to 2dp
/// before subtracting
fn apply_discount(amount: Decimal, pct: Decimal) -> Decimal {
    amount - round_money(amount * pct / Decimal::from(100))
}

/// Calculate the fare for one trip.
///
/// `final_amount` is always in `[0, base_amount]`; the cap step can clip it
/// to zero when the pass has already spent the whole cap today.
pub fn calculate(input: &FareInput, rule: &FareRule, schedule: &DiscountSchedule) -> FareResult {
    let base_amount = rule.base_fare(input.distance_km);
    let mut running = base_amount;
    let mut applied: Vec<String> = Vec::new();
    let mut capped = false;

    // Off-peak window, skipped when departure time is unknown
    if let Some(departure) = input.departure_time {
        if schedule.is_off_peak(departure) {
            let pct = schedule.off_peak_pct;
            running = apply_discount(running, pct);
            applied.push(format!("Off-peak -{}%", pct));
        }
    }

    // Tier discount
    let tier_pct = input.tier.discount_pct();
    if tier_pct > Decimal::ZERO {
        running = apply_discount(running, tier_pct);
        applied.push(format!("{} tier -{}%", input.tier, tier_pct));
    }

    // Loyalty discount
    if input.total_trips >= schedule.loyalty_trips_required {
        let pct = schedule.loyalty_pct;
        running = apply_discount(running, pct);
        applied.push(format!("Loyalty -{}%", pct));
    }

    // Daily cap: clip to what remains of today's budget
    if let Some(spend) = input.daily_spend {
        if spend + running > schedule.daily_cap {
            let remaining = (schedule.daily_cap - spend).max(Decimal::ZERO);
            running = round_money(remaining);
            capped = true;
            applied.push(format!("Daily cap {} FCFA", schedule.daily_cap));
        }
    }

    let final_amount = running.max(Decimal::ZERO);
    let discount_amount = (base_amount - final_amount).max(Decimal::ZERO);

    let note = if capped {
        "Fare clipped by the daily spending cap".to_string()
    } else if applied.is_empty() {
        "Standard fare".to_string()
    } else {
        format!("{} discount(s) applied", applied.len())
    };

    FareResult {
        base_amount,
        discount_amount,
        final_amount,
        applied_discounts: applied,
        capped_by_daily_limit: capped,
        fallback_used: false,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mobi_core::models::TransportMode;
    use rust_decimal_macros::dec;

    fn schedule() -> DiscountSchedule {
        DiscountSchedule {
            off_peak_start_hour: 22,
            off_peak_end_hour: 6,
            off_peak_pct: dec!(20),
            loyalty_trips_required: 10,
            loyalty_pct: dec!(5),
            daily_cap: dec!(2000),
        }
    }

    fn rule() -> FareRule {
        FareRule {
            base_price: dec!(150),
            price_per_km: dec!(25),
            ..FareRule::default_for(TransportMode::Bus)
        }
    }

    fn at_hour(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_discount_rounds_before_subtracting() {
        // 10% of 10.05 is 1.005, which rounds half-up to 1.01
        assert_eq!(apply_discount(dec!(10.05), dec!(10)), dec!(9.04));
        // Exact discounts are unaffected
        assert_eq!(apply_discount(dec!(400), dec!(20)), dec!(320.00));
    }

    #[test]
    fn test_daytime_standard_fare() {
        let input = FareInput {
            distance_km: dec!(10),
            departure_time: Some(at_hour(14)),
            tier: PassTier::Standard,
            total_trips: 2,
            daily_spend: Some(dec!(0)),
        };

        let result = calculate(&input, &rule(), &schedule());
        assert_eq!(result.base_amount, dec!(400.00));
        assert_eq!(result.final_amount, dec!(400.00));
        assert_eq!(result.discount_amount, dec!(0.00));
        assert!(result.applied_discounts.is_empty());
        assert!(!result.capped_by_daily_limit);
    }

    #[test]
    fn test_off_peak_discount_at_23h() {
        let input = FareInput {
            distance_km: dec!(10),
            departure_time: Some(at_hour(23)),
            tier: PassTier::Standard,
            total_trips: 2,
            daily_spend: Some(dec!(0)),
        };

        let result = calculate(&input, &rule(), &schedule());
        assert_eq!(result.final_amount, dec!(320.00));
        assert_eq!(result.applied_discounts.len(), 1);
    }

    #[test]
    fn test_off_peak_discount_before_6h() {
        let input = FareInput {
            distance_km: dec!(10),
            departure_time: Some(at_hour(5)),
            tier: PassTier::Standard,
            total_trips: 0,
            daily_spend: None,
        };

        let result = calculate(&input, &rule(), &schedule());
        assert_eq!(result.final_amount, dec!(320.00));
    }

    #[test]
    fn test_gold_tier_with_loyalty() {
        // base 400, GOLD -15% -> 340, loyalty -5% on 340 -> 323
        let input = FareInput {
            distance_km: dec!(10),
            departure_time: Some(at_hour(14)),
            tier: PassTier::Gold,
            total_trips: 12,
            daily_spend: Some(dec!(0)),
        };

        let result = calculate(&input, &rule(), &schedule());
        assert_eq!(result.base_amount, dec!(400.00));
        assert_eq!(result.final_amount, dec!(323.00));
        assert_eq!(result.discount_amount, dec!(77.00));
        assert_eq!(result.applied_discounts.len(), 2);
    }

    #[test]
    fn test_daily_cap_clips_fare() {
        // already spent 1900 of the 2000 cap; a 300 fare clips to 100
        let input = FareInput {
            distance_km: dec!(6),
            departure_time: Some(at_hour(14)),
            tier: PassTier::Standard,
            total_trips: 0,
            daily_spend: Some(dec!(1900)),
        };

        let result = calculate(&input, &rule(), &schedule());
        assert_eq!(result.base_amount, dec!(300.00));
        assert_eq!(result.final_amount, dec!(100.00));
        assert!(result.capped_by_daily_limit);
    }

    #[test]
    fn test_daily_cap_exhausted_zeroes_fare() {
        let input = FareInput {
            distance_km: dec!(6),
            departure_time: Some(at_hour(14)),
            tier: PassTier::Standard,
            total_trips: 0,
            daily_spend: Some(dec!(2500)),
        };

        let result = calculate(&input, &rule(), &schedule());
        assert_eq!(result.final_amount, dec!(0.00));
        assert!(result.capped_by_daily_limit);
    }

    #[test]
    fn test_unknown_spend_skips_cap() {
        let input = FareInput {
            distance_km: dec!(100),
            departure_time: Some(at_hour(14)),
            tier: PassTier::Standard,
            total_trips: 0,
            daily_spend: None,
        };

        // 150 + 25*100 = 2650, above the cap, but spend is unknown
        let result = calculate(&input, &rule(), &schedule());
        assert_eq!(result.final_amount, dec!(2650.00));
        assert!(!result.capped_by_daily_limit);
    }

    #[test]
    fn test_unknown_departure_skips_off_peak() {
        let input = FareInput {
            distance_km: dec!(10),
            departure_time: None,
            tier: PassTier::Standard,
            total_trips: 0,
            daily_spend: Some(dec!(0)),
        };

        let result = calculate(&input, &rule(), &schedule());
        assert_eq!(result.final_amount, dec!(400.00));
    }

    #[test]
    fn test_discounts_stack_in_order() {
        // base 400, off-peak -20% -> 320, PLATINUM -30% -> 224, loyalty -5% -> 212.80
        let input = FareInput {
            distance_km: dec!(10),
            departure_time: Some(at_hour(23)),
            tier: PassTier::Platinum,
            total_trips: 50,
            daily_spend: Some(dec!(0)),
        };

        let result = calculate(&input, &rule(), &schedule());
        assert_eq!(result.final_amount, dec!(212.80));
        assert_eq!(result.applied_discounts.len(), 3);
        assert_eq!(result.discount_amount, dec!(187.20));
    }

    #[test]
    fn test_final_never_exceeds_base() {
        let input = FareInput {
            distance_km: dec!(3.7),
            departure_time: Some(at_hour(23)),
            tier: PassTier::Silver,
            total_trips: 15,
            daily_spend: Some(dec!(500)),
        };

        let result = calculate(&input, &rule(), &schedule());
        assert!(result.final_amount <= result.base_amount);
        assert!(result.final_amount >= Decimal::ZERO);
        assert_eq!(
            result.discount_amount,
            result.base_amount - result.final_amount
        );
    }

    #[test]
    fn test_recalculation_is_deterministic() {
        let input = FareInput {
            distance_km: dec!(12.5),
            departure_time: Some(at_hour(22)),
            tier: PassTier::Gold,
            total_trips: 11,
            daily_spend: Some(dec!(300)),
        };

        let first = calculate(&input, &rule(), &schedule());
        let second = calculate(&input, &rule(), &schedule());
        assert_eq!(first, second);
    }
}

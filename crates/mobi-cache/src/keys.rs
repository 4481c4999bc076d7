//! Cache key constants and builders for MobiPass
//!
//! Standardized key naming for cached entities and pub/sub channel names,
//! ensuring consistency across the application and preventing collisions.
//!
//! # Key Patterns
//!
//! - `fare_rule:{mode}` - Cached active fare rule per transport mode
//! - `discount_policies:active` - Cached active discount policy list
//!
//! # Channels
//!
//! - `events:trip_completed` - Published after each successful trip payment
//! - `events:pricing_fallback` - Published when the fallback fare table is used

/// Prefix for cached fare rules
///
/// Format: `fare_rule:{mode}`
pub const FARE_RULE_PREFIX: &str = "fare_rule";

/// Key for the cached active discount policy list
pub const DISCOUNT_POLICIES_KEY: &str = "discount_policies:active";

/// Channel for trip-completed events
pub const TRIP_COMPLETED_CHANNEL: &str = "events:trip_completed";

/// Channel for pricing-fallback events
pub const PRICING_FALLBACK_CHANNEL: &str = "events:pricing_fallback";

/// Default TTL for fare rules (5 minutes)
pub const FARE_RULE_TTL_SECS: u64 = 300;

/// Default TTL for the discount policy list (5 minutes)
pub const DISCOUNT_POLICIES_TTL_SECS: u64 = 300;

/// Build a cache key for the active fare rule of a transport mode
///
/// # Example
///
/// ```
/// use mobi_cache::keys::fare_rule_key;
///
/// let key = fare_rule_key("BUS");
/// assert_eq!(key, "fare_rule:BUS");
/// ```
pub fn fare_rule_key(mode: &str) -> String {
    format!("{}:{}", FARE_RULE_PREFIX, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_rule_key() {
        assert_eq!(fare_rule_key("BUS"), "fare_rule:BUS");
        assert_eq!(fare_rule_key("TER"), "fare_rule:TER");
    }

    #[test]
    fn test_key_uniqueness() {
        let keys = vec![
            fare_rule_key("123"),
            fare_rule_key("TER"),
            DISCOUNT_POLICIES_KEY.to_string(),
        ];

        let unique_count = keys.iter().collect::<std::collections::HashSet<_>>().len();
        assert_eq!(unique_count, keys.len());
    }

    #[test]
    fn test_channels_distinct() {
        assert_ne!(TRIP_COMPLETED_CHANNEL, PRICING_FALLBACK_CHANNEL);
    }
}

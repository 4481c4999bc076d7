//! Mobility pass model
//!
//! Represents a rider's prepaid stored-value account. The balance is mutated
//! exclusively through ledger debit/credit operations; this crate only
//! exposes read-side helpers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pass lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    /// Active pass - can pay for trips
    #[default]
    Active,
    /// Suspended pass - temporarily blocked by an administrator
    Suspended,
    /// Expired pass - validity period elapsed, must be renewed
    Expired,
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassStatus::Active => write!(f, "active"),
            PassStatus::Suspended => write!(f, "suspended"),
            PassStatus::Expired => write!(f, "expired"),
        }
    }
}

impl PassStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(PassStatus::Active),
            "suspended" => Some(PassStatus::Suspended),
            "expired" => Some(PassStatus::Expired),
            _ => None,
        }
    }

    /// Check if the pass can be debited
    pub fn can_pay(&self) -> bool {
        matches!(self, PassStatus::Active)
    }
}

/// Pass tier, granting progressively larger fare discounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PassTier {
    #[default]
    Standard,
    Silver,
    Gold,
    Platinum,
}

impl fmt::Display for PassTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassTier::Standard => write!(f, "STANDARD"),
            PassTier::Silver => write!(f, "SILVER"),
            PassTier::Gold => write!(f, "GOLD"),
            PassTier::Platinum => write!(f, "PLATINUM"),
        }
    }
}

impl PassTier {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "STANDARD" => Some(PassTier::Standard),
            "SILVER" => Some(PassTier::Silver),
            "GOLD" => Some(PassTier::Gold),
            "PLATINUM" => Some(PassTier::Platinum),
            _ => None,
        }
    }

    /// Fare discount percentage granted by this tier
    pub fn discount_pct(&self) -> Decimal {
        match self {
            PassTier::Standard => Decimal::ZERO,
            PassTier::Silver => Decimal::from(10),
            PassTier::Gold => Decimal::from(15),
            PassTier::Platinum => Decimal::from(30),
        }
    }
}

/// Mobility pass entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pass {
    /// Unique identifier
    pub id: Uuid,

    /// Owning rider
    pub rider_id: Uuid,

    /// Human-readable pass number (e.g. "SMP-1A2B3C4D")
    pub pass_number: String,

    /// Lifecycle status
    pub status: PassStatus,

    /// Current prepaid balance in FCFA (never negative)
    pub balance: Decimal,

    /// End of the validity period
    pub expiration_date: DateTime<Utc>,

    /// Discount tier
    pub tier: PassTier,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Pass {
    /// Check if the pass is active
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.can_pay()
    }

    /// Whether the validity period has elapsed but the status has not yet
    /// been flipped. Expiry is applied lazily on first read past the date.
    pub fn is_past_expiration(&self, now: DateTime<Utc>) -> bool {
        self.status != PassStatus::Expired && now > self.expiration_date
    }

    /// Check if the pass can start a trip given the minimum balance floor
    pub fn can_start_trip(&self, minimum_balance: Decimal) -> bool {
        self.is_active() && self.balance >= minimum_balance
    }

    /// Generate a pass number in the `SMP-XXXXXXXX` format
    pub fn generate_pass_number() -> String {
        let raw = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("SMP-{}", &raw[..8])
    }
}

impl Default for Pass {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            pass_number: Pass::generate_pass_number(),
            status: PassStatus::Active,
            balance: Decimal::ZERO,
            expiration_date: Utc::now() + chrono::Duration::days(365),
            tier: PassTier::Standard,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tier_discount_pct() {
        assert_eq!(PassTier::Standard.discount_pct(), Decimal::ZERO);
        assert_eq!(PassTier::Silver.discount_pct(), dec!(10));
        assert_eq!(PassTier::Gold.discount_pct(), dec!(15));
        assert_eq!(PassTier::Platinum.discount_pct(), dec!(30));
    }

    #[test]
    fn test_can_start_trip() {
        let pass = Pass {
            balance: dec!(100.00),
            ..Default::default()
        };

        assert!(pass.can_start_trip(dec!(100)));
        assert!(!pass.can_start_trip(dec!(100.01)));
    }

    #[test]
    fn test_suspended_pass_cannot_start_trip() {
        let pass = Pass {
            status: PassStatus::Suspended,
            balance: dec!(5000.00),
            ..Default::default()
        };

        assert!(!pass.can_start_trip(dec!(100)));
    }

    #[test]
    fn test_is_past_expiration() {
        let now = Utc::now();
        let pass = Pass {
            expiration_date: now - chrono::Duration::days(1),
            ..Default::default()
        };
        assert!(pass.is_past_expiration(now));

        // Already expired passes are not flagged again
        let expired = Pass {
            status: PassStatus::Expired,
            expiration_date: now - chrono::Duration::days(1),
            ..Default::default()
        };
        assert!(!expired.is_past_expiration(now));
    }

    #[test]
    fn test_pass_number_format() {
        let number = Pass::generate_pass_number();
        assert!(number.starts_with("SMP-"));
        assert_eq!(number.len(), 12);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [PassStatus::Active, PassStatus::Suspended, PassStatus::Expired] {
            assert_eq!(PassStatus::from_str(&status.to_string()), Some(status));
        }
        assert_eq!(PassStatus::from_str("bogus"), None);
    }
}

//! Shared process-wide state injected through actix app data

use mobi_services::CircuitBreaker;
use std::sync::Arc;

/// The two outbound-call breakers, created once at startup
///
/// Handlers construct services per request, but the breakers must be shared
/// so failure history survives across requests.
#[derive(Clone)]
pub struct Breakers {
    /// Guards the fare calculation path
    pub pricing: Arc<CircuitBreaker>,

    /// Guards the daily-spend lookup
    pub spend: Arc<CircuitBreaker>,
}

impl Breakers {
    /// Create both breakers from configuration
    pub fn new(config: &mobi_core::config::BreakerConfig) -> Self {
        Self {
            pricing: Arc::new(CircuitBreaker::new("pricing", config)),
            spend: Arc::new(CircuitBreaker::new("daily_spend", config)),
        }
    }
}

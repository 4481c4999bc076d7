//! Domain event publisher
//!
//! Publishes trip and pricing events as JSON on Redis pub/sub channels.
//! Delivery is best-effort: subscribers may be absent and failures are
//! reported to the caller, who logs and moves on.

use mobi_cache::{keys, RedisCache};
use mobi_core::{
    models::{PricingFallbackEvent, TripCompletedEvent},
    traits::EventPublisher,
    AppError, AppResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Redis-backed event publisher
pub struct RedisEventPublisher {
    cache: Arc<RedisCache>,
}

impl RedisEventPublisher {
    /// Create a new event publisher
    pub fn new(cache: Arc<RedisCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    #[instrument(skip(self, event), fields(trip_id = %event.trip_id))]
    async fn publish_trip_completed(&self, event: &TripCompletedEvent) -> AppResult<()> {
        let receivers = self
            .cache
            .publish(keys::TRIP_COMPLETED_CHANNEL, event)
            .await
            .map_err(|e| AppError::EventPublish(e.to_string()))?;

        debug!(
            "Published trip_completed for {} to {} subscriber(s)",
            event.trip_id, receivers
        );
        Ok(())
    }

    #[instrument(skip(self, event), fields(trip_id = %event.trip_id))]
    async fn publish_pricing_fallback(&self, event: &PricingFallbackEvent) -> AppResult<()> {
        let receivers = self
            .cache
            .publish(keys::PRICING_FALLBACK_CHANNEL, event)
            .await
            .map_err(|e| AppError::EventPublish(e.to_string()))?;

        debug!(
            "Published pricing_fallback for {} to {} subscriber(s)",
            event.trip_id, receivers
        );
        Ok(())
    }
}

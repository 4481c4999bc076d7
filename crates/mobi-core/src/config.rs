//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub pricing: PricingConfig,
    pub billing: BillingConfig,
    pub breaker: BreakerConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

/// Redis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Default TTL for cached items in seconds
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

/// Fare pricing configuration
///
/// Defaults match the seeded discount policies; active `DiscountPolicy`
/// rows override these per calculation.
#[derive(Debug, Deserialize, Clone)]
pub struct PricingConfig {
    /// Maximum amount a pass may be debited per calendar day (FCFA)
    #[serde(default = "default_daily_cap")]
    pub daily_cap: f64,

    /// Hour (0-23) at which the off-peak window opens
    #[serde(default = "default_off_peak_start")]
    pub off_peak_start_hour: u32,

    /// Hour (0-23) at which the off-peak window closes
    #[serde(default = "default_off_peak_end")]
    pub off_peak_end_hour: u32,

    /// Off-peak discount percentage
    #[serde(default = "default_off_peak_discount")]
    pub off_peak_discount_pct: f64,

    /// Lifetime trips required for the loyalty discount
    #[serde(default = "default_loyalty_trips")]
    pub loyalty_trips_required: i64,

    /// Loyalty discount percentage
    #[serde(default = "default_loyalty_discount")]
    pub loyalty_discount_pct: f64,
}

fn default_daily_cap() -> f64 {
    2000.0
}

fn default_off_peak_start() -> u32 {
    22
}

fn default_off_peak_end() -> u32 {
    6
}

fn default_off_peak_discount() -> f64 {
    20.0
}

fn default_loyalty_trips() -> i64 {
    10
}

fn default_loyalty_discount() -> f64 {
    5.0
}

/// Billing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    /// Minimum balance required before a trip may start (FCFA)
    #[serde(default = "default_minimum_balance")]
    pub minimum_balance: f64,

    /// Balance below which a low-balance warning is logged after debit (FCFA)
    #[serde(default = "default_low_balance_threshold")]
    pub low_balance_threshold: f64,
}

fn default_minimum_balance() -> f64 {
    100.0
}

fn default_low_balance_threshold() -> f64 {
    500.0
}

/// Circuit breaker configuration, shared by the pricing and
/// daily-spend breakers
#[derive(Debug, Deserialize, Clone)]
pub struct BreakerConfig {
    /// Failure rate (percent) at which the breaker opens
    #[serde(default = "default_failure_rate")]
    pub failure_rate_threshold: u32,

    /// Sliding window size (call count) for the failure rate
    #[serde(default = "default_window_size")]
    pub sliding_window_size: usize,

    /// Minimum calls in the window before the rate is evaluated
    #[serde(default = "default_minimum_calls")]
    pub minimum_calls: usize,

    /// Seconds to wait in OPEN before probing (HALF_OPEN)
    #[serde(default = "default_open_wait")]
    pub open_wait_secs: u64,

    /// Consecutive probe successes required to close again
    #[serde(default = "default_half_open_probes")]
    pub half_open_probes: u32,
}

fn default_failure_rate() -> u32 {
    50
}

fn default_window_size() -> usize {
    10
}

fn default_minimum_calls() -> usize {
    5
}

fn default_open_wait() -> u64 {
    30
}

fn default_half_open_probes() -> u32 {
    2
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: default_failure_rate(),
            sliding_window_size: default_window_size(),
            minimum_calls: default_minimum_calls(),
            open_wait_secs: default_open_wait(),
            half_open_probes: default_half_open_probes(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            daily_cap: default_daily_cap(),
            off_peak_start_hour: default_off_peak_start(),
            off_peak_end_hour: default_off_peak_end(),
            off_peak_discount_pct: default_off_peak_discount(),
            loyalty_trips_required: default_loyalty_trips(),
            loyalty_discount_pct: default_loyalty_discount(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            minimum_balance: default_minimum_balance(),
            low_balance_threshold: default_low_balance_threshold(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("redis.default_ttl_secs", 300)?
            .set_default("pricing.daily_cap", 2000.0)?
            .set_default("pricing.off_peak_start_hour", 22)?
            .set_default("pricing.off_peak_end_hour", 6)?
            .set_default("pricing.off_peak_discount_pct", 20.0)?
            .set_default("pricing.loyalty_trips_required", 10)?
            .set_default("pricing.loyalty_discount_pct", 5.0)?
            .set_default("billing.minimum_balance", 100.0)?
            .set_default("billing.low_balance_threshold", 500.0)?
            .set_default("breaker.failure_rate_threshold", 50)?
            .set_default("breaker.sliding_window_size", 10)?
            .set_default("breaker.minimum_calls", 5)?
            .set_default("breaker.open_wait_secs", 30)?
            .set_default("breaker.half_open_probes", 2)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with MOBIPASS_ prefix
            .add_source(
                Environment::with_prefix("MOBIPASS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("MOBIPASS").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pricing_config() {
        let config = PricingConfig::default();
        assert_eq!(config.daily_cap, 2000.0);
        assert_eq!(config.off_peak_start_hour, 22);
        assert_eq!(config.off_peak_end_hour, 6);
        assert_eq!(config.loyalty_trips_required, 10);
    }

    #[test]
    fn test_default_breaker_config() {
        let config = BreakerConfig::default();
        assert_eq!(config.failure_rate_threshold, 50);
        assert_eq!(config.open_wait_secs, 30);
    }
}

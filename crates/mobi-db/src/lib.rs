//! MobiPass Database Layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the MobiPass system. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for passes, trips, fare rules, fare
//!   calculations and the billing ledger
//! - Row-level locking support for atomic balance updates

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use mobi_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};

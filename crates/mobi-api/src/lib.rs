//! API layer for MobiPass
//!
//! HTTP handlers for trip payment, billing and pricing operations.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;
pub mod identity;
pub mod state;

pub use dto::ApiResponse;
pub use handlers::{configure_billing, configure_pricing, configure_trips};
pub use identity::{AdminCaller, CallerIdentity};
pub use state::Breakers;

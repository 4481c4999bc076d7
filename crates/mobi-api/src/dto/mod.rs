//! Data transfer objects

pub mod billing;
pub mod common;
pub mod pricing;
pub mod trip;

pub use common::ApiResponse;

//! Repository implementations
//!
//! PostgreSQL-backed implementations of the storage traits in mobi-core.

pub mod fare_calculation_repo;
pub mod ledger_repo;
pub mod pass_repo;
pub mod rule_repo;
pub mod trip_repo;

pub use fare_calculation_repo::PgFareCalculationRepository;
pub use ledger_repo::PgLedgerRepository;
pub use pass_repo::PgPassRepository;
pub use rule_repo::{PgDiscountPolicyRepository, PgFareRuleRepository};
pub use trip_repo::PgTripRepository;

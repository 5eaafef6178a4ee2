//! Coverage analysis and test selection.
//!
//! Turns raw line-coverage records and the component dependency graph into a
//! pass/fail coverage verdict and the minimal set of test classes that
//! reproduces the measured coverage.

pub mod aggregate;
pub mod api;
pub mod deps;
pub mod select;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testutil;

pub use aggregate::{aggregate_coverage, Apex, Test};
pub use api::ToolingApi;
pub use deps::resolve_dependencies;
pub use select::{select_max_coverage, COVERAGE_THRESHOLD};
pub use strategy::Strategy;

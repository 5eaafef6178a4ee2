//! Shared foundation for the covgate workspace.
//!
//! Holds the error taxonomy, the org credentials configuration and the
//! polymorphic sObject record used by both the query and bulk-write paths.

pub mod config;
pub mod error;
pub mod sobject;

pub use config::OrgConfig;
pub use error::{
    BatchError, BatchFailure, CoverageDeficiencies, CovgateError, Deficiency, Result, TargetKind,
};
pub use sobject::{FieldValue, SObject};

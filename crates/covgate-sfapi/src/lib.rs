//! Salesforce API access layer.
//!
//! Provides:
//! - `Connection`: bearer-token request executor with refresh-on-403 retry
//! - Typed tooling-API queries (coverage, dependencies, class metadata)
//! - Generic SOQL query returning polymorphic records
//! - Batched, concurrent sObject Collections bulk writes

pub mod collections;
pub mod connection;
pub mod rest;
pub mod tooling;

pub use collections::{BulkWriteReport, CollectionsError, CollectionsResponse, BATCH_SIZE};
pub use connection::Connection;
pub use rest::QueryError;
pub use tooling::{
    ApexClassInfo, ApexCodeCoverage, LineCoverage, MetadataComponentDependency, NamedRecord,
    RecordAttributes, TypedRecord, APEX_CLASS, APEX_TRIGGER,
};

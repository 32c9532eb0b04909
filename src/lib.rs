//! cpiscan - Static structural and security analysis of SAP Integration
//! Suite artifacts.
//!
//! Given an IFlow artifact (a ZIP archive or a bare BPMN/IFL XML
//! definition), this library recovers a normalized structural model
//! (senders, receivers, adapters, mappings, parameters, error-handling
//! constructs) and runs a layered security-compliance pass over it,
//! tolerating inconsistent namespaces, missing files and malformed XML.
//!
//! # Example
//!
//! ```no_run
//! use cpiscan::{analyze_artifact, ScanOptions};
//!
//! let result = analyze_artifact("OrderFlow____com.example.order.zip", &ScanOptions::default());
//!
//! for issue in &result.security_issues {
//!     println!("{}: {}", result.artifact_name, issue);
//! }
//! ```
//!
//! Analysis never fails hard: anything short of being unable to read the
//! artifact degrades into `processing_errors` on the returned record, and
//! even a fully unreadable artifact yields a record with its `error` field
//! set rather than an `Err`.

mod fallback;

pub mod config;
pub mod error;
pub mod inspector;
pub mod parser;
pub mod profiles;
pub mod properties;
pub mod security;
pub mod sniff;
pub mod types;
pub mod unpack;

// Re-export commonly used types at crate root
pub use config::{ArchiveLimits, ScanOptions};
pub use error::{Result, ScanError};
pub use inspector::Inspector;
pub use profiles::NamespaceProfile;
pub use properties::{extract_properties, PropertyMap};
pub use security::{check_security_compliance, SecurityReport};
pub use sniff::ArtifactKind;
pub use types::{
    ConnectionDetail, ErrorHandler, ExtractionResult, KeyStep, MappingEntity, Parameter,
    Participant, WorkflowProcess,
};

use std::path::Path;

/// Analyze a single artifact and return its extraction result.
///
/// This is the main entry point for analyzing artifacts programmatically.
/// Equivalent to building an [`Inspector`] with the given options and
/// calling [`Inspector::analyze`].
pub fn analyze_artifact<P: AsRef<Path>>(path: P, options: &ScanOptions) -> ExtractionResult {
    Inspector::with_options(options.clone()).analyze(path)
}

//! # sf-export
//!
//! Exports Salesforce CRM objects to Parquet files in an object store.
//!
//! Each configured sObject type runs as its own export task: a query
//! cursor pages records out of the Salesforce REST API, an accumulator
//! regroups them into fixed-size batches, each batch is encoded as one
//! Parquet part file, and the part is uploaded under a deterministic
//! key. An orchestrator fans the tasks out under a bounded concurrency
//! cap and aggregates per-object results into a report.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sf_export::{ExportJobConfig, ExportOrchestrator, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ExportJobConfig::from_file("job.json")?;
//!     let orchestrator = ExportOrchestrator::connect(config)?;
//!
//!     let report = orchestrator.run().await;
//!     for result in report.results() {
//!         println!("{}: {} records", result.object_type(), result.records_exported());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ExportOrchestrator                      │
//! │  one task per sObject type, bounded by max_concurrent       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌────────────┬──────────────┴────┬──────────────┬─────────────┐
//! │ Salesforce │     Extract       │    Encode    │   Upload    │
//! ├────────────┼───────────────────┼──────────────┼─────────────┤
//! │ OAuth2     │ PageCursor        │ Schema union │ S3 / GCS /  │
//! │ describe   │ BatchAccumulator  │ Arrow        │ Azure /     │
//! │ SOQL query │                   │ Parquet      │ local       │
//! └────────────┴───────────────────┴──────────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Export job configuration
pub mod config;

/// Salesforce REST client
pub mod salesforce;

/// Record paging and batch accumulation
pub mod extract;

/// Columnar Parquet encoding
pub mod encode;

/// Object store upload
pub mod upload;

/// Export tasks and orchestration
pub mod export;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

pub use config::{CoercionPolicy, CompressionCodec, ExportJobConfig, SalesforceCredentials};
pub use export::{ExportOrchestrator, ExportReport, ObjectExportResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

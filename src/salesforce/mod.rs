//! Salesforce REST API client
//!
//! Consumes the remote query surface: OAuth2 username-password login,
//! SObject describe, and cursor-paged SOQL queries. The `QueryApi` trait
//! is the seam the export pipeline programs against; `SalesforceClient`
//! is the production implementation.

mod client;
mod types;

pub use client::{SalesforceClient, SalesforceClientConfig};
pub use types::{QueryApi, QueryPage, RawRecord};

#[cfg(test)]
mod tests;

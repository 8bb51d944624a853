//! Wire types for the Salesforce REST API

use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// One queried entity instance: field name to primitive value
/// (string, number, boolean, null, or nested mapping)
pub type RawRecord = serde_json::Map<String, Value>;

/// One page of query results
#[derive(Debug, Clone)]
pub struct QueryPage {
    /// Records in this page, platform metadata stripped
    pub records: Vec<RawRecord>,
    /// Opaque locator for the next page, `None` when exhausted
    pub next: Option<String>,
    /// Total records the query will yield
    pub total_size: u64,
}

/// Cursor-paged remote query API
///
/// `open` runs the query for an object type and returns the first page;
/// `next_page` follows a locator returned by a previous page. Both fail
/// with [`crate::Error::RemoteQuery`] once transport retries are
/// exhausted.
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Open a query for an object type and fetch the first page
    async fn open(&self, object_type: &str) -> Result<QueryPage>;

    /// Fetch the page behind a locator from a previous page
    async fn next_page(&self, object_type: &str, locator: &str) -> Result<QueryPage>;
}

// ============================================================================
// Wire formats
// ============================================================================

/// Response from the OAuth2 token endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub instance_url: String,
}

/// Response from the query endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub total_size: u64,
    pub done: bool,
    #[serde(default)]
    pub next_records_url: Option<String>,
    pub records: Vec<RawRecord>,
}

impl QueryResponse {
    /// Convert into a [`QueryPage`], dropping the per-record `attributes`
    /// metadata the platform attaches to every row
    pub(crate) fn into_page(self) -> QueryPage {
        let next = if self.done { None } else { self.next_records_url };
        let records = self
            .records
            .into_iter()
            .map(|mut record| {
                record.remove("attributes");
                record
            })
            .collect();
        QueryPage {
            records,
            next,
            total_size: self.total_size,
        }
    }
}

/// Response from the SObject describe endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct DescribeResponse {
    pub fields: Vec<FieldDescribe>,
}

/// One field in a describe response
#[derive(Debug, Deserialize)]
pub(crate) struct FieldDescribe {
    pub name: String,
}

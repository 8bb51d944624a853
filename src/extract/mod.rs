//! Record extraction: page cursor and batch accumulation
//!
//! `PageCursor` turns the remote query API into a lazy, finite sequence
//! of record pages for one object type. `BatchAccumulator` re-chunks
//! those pages into batches of exactly the configured size, with one
//! final partial batch.

use crate::error::Result;
use crate::salesforce::{QueryApi, RawRecord};
use std::sync::Arc;

// ============================================================================
// Page Cursor
// ============================================================================

/// Lazy cursor over one object type's query results
///
/// Holds at most one page in flight. Once exhausted, further calls to
/// [`PageCursor::next_page`] are no-ops returning `None`.
pub struct PageCursor {
    api: Arc<dyn QueryApi>,
    object_type: String,
    pending: Option<Vec<RawRecord>>,
    locator: Option<String>,
    total_size: u64,
    done: bool,
}

impl std::fmt::Debug for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCursor")
            .field("object_type", &self.object_type)
            .field("pending", &self.pending)
            .field("locator", &self.locator)
            .field("total_size", &self.total_size)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl PageCursor {
    /// Open a query and fetch the first page
    ///
    /// Fails with [`crate::Error::RemoteQuery`] when the remote API
    /// rejects the query (bad object type, auth failure).
    pub async fn open(api: Arc<dyn QueryApi>, object_type: impl Into<String>) -> Result<Self> {
        let object_type = object_type.into();
        let first = api.open(&object_type).await?;
        Ok(Self {
            api,
            object_type,
            locator: first.next.clone(),
            total_size: first.total_size,
            pending: Some(first.records),
            done: false,
        })
    }

    /// Fetch the next page of records, or `None` when exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<RawRecord>>> {
        if let Some(records) = self.pending.take() {
            return Ok(Some(records));
        }
        if self.done {
            return Ok(None);
        }

        match self.locator.take() {
            Some(locator) => {
                let page = self.api.next_page(&self.object_type, &locator).await?;
                self.locator = page.next;
                if self.locator.is_none() {
                    self.done = true;
                }
                Ok(Some(page.records))
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// The object type this cursor queries
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// Total records the remote query reports
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Whether the cursor has been exhausted
    pub fn is_done(&self) -> bool {
        self.done && self.pending.is_none()
    }
}

// ============================================================================
// Batch
// ============================================================================

/// An ordered batch of records for one object type
///
/// Every batch except possibly the last holds exactly the configured
/// batch size. The batch owns its records exclusively until encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    records: Vec<RawRecord>,
}

impl Batch {
    pub(crate) fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// The records in this batch, in input order
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Number of records in this batch
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Batch Accumulator
// ============================================================================

/// Buffers pushed records into fixed-size batches
///
/// Input order is preserved; no record is duplicated or dropped across
/// a push/flush sequence.
#[derive(Debug)]
pub struct BatchAccumulator {
    capacity: usize,
    buffer: Vec<RawRecord>,
}

impl BatchAccumulator {
    /// Create an accumulator producing batches of `capacity` records
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "batch capacity must be positive");
        Self {
            capacity,
            buffer: Vec::new(),
        }
    }

    /// Push records, returning zero or more completed full batches
    pub fn push(&mut self, records: Vec<RawRecord>) -> Vec<Batch> {
        self.buffer.extend(records);

        let mut batches = Vec::new();
        while self.buffer.len() >= self.capacity {
            let records: Vec<RawRecord> = self.buffer.drain(..self.capacity).collect();
            batches.push(Batch::new(records));
        }
        batches
    }

    /// Flush the final partial batch, if any records remain
    pub fn flush(&mut self) -> Option<Batch> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(Batch::new(std::mem::take(&mut self.buffer)))
    }

    /// Records currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

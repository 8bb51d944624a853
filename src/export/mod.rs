//! Export pipeline: per-object tasks and the orchestrator
//!
//! `ObjectExportTask` drives one object type through the pipeline
//! stages (cursor → accumulator → encoder → uploader) as a small state
//! machine. `ExportOrchestrator` fans out one task per configured
//! object type under a bounded concurrency cap and aggregates the
//! results into an [`ExportReport`] in configured order.
//!
//! One task's failure never cancels its siblings; only a cancellation
//! signal stops the run, and even then in-flight uploads complete.

mod types;

pub use types::{ExportReport, ObjectExportResult, TaskState};

use crate::config::ExportJobConfig;
use crate::encode::ColumnEncoder;
use crate::error::{Error, Result};
use crate::extract::{Batch, BatchAccumulator, PageCursor};
use crate::salesforce::{QueryApi, SalesforceClient};
use crate::upload::{Destination, ObjectStoreUploader};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ============================================================================
// Object Export Task
// ============================================================================

/// Exports one object type end to end
///
/// Stages run sequentially: each completed batch is encoded and
/// uploaded before the next page is pulled, so at most one batch and
/// one page are buffered at a time.
pub struct ObjectExportTask {
    object_type: String,
    api: Arc<dyn QueryApi>,
    uploader: Arc<ObjectStoreUploader>,
    encoder: ColumnEncoder,
    batch_size: usize,
    cancel: CancellationToken,
    state: TaskState,
    records_flushed: u64,
    parts_flushed: u32,
    locations: Vec<String>,
}

impl ObjectExportTask {
    /// Create a task for one object type
    pub fn new(
        object_type: impl Into<String>,
        api: Arc<dyn QueryApi>,
        uploader: Arc<ObjectStoreUploader>,
        encoder: ColumnEncoder,
        batch_size: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            api,
            uploader,
            encoder,
            batch_size,
            cancel,
            state: TaskState::Opening,
            records_flushed: 0,
            parts_flushed: 0,
            locations: Vec::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Run the task to a terminal state
    pub async fn run(mut self) -> ObjectExportResult {
        info!("Starting export of {}", self.object_type);

        match self.drive().await {
            Ok(()) => {
                info!(
                    "Completed {}: {} records in {} parts",
                    self.object_type, self.records_flushed, self.parts_flushed
                );
                ObjectExportResult::Success {
                    object_type: self.object_type,
                    total_records: self.records_flushed,
                    total_parts: self.parts_flushed,
                    locations: self.locations,
                }
            }
            Err(error) => {
                self.state = TaskState::Failed;
                warn!(
                    "Export of {} failed after {} records: {error}",
                    self.object_type, self.records_flushed
                );
                ObjectExportResult::Failure {
                    object_type: self.object_type,
                    error,
                    records_flushed: self.records_flushed,
                    parts_flushed: self.parts_flushed,
                }
            }
        }
    }

    async fn drive(&mut self) -> Result<()> {
        self.state = TaskState::Opening;
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let mut cursor = PageCursor::open(Arc::clone(&self.api), self.object_type.clone()).await?;
        debug!(
            "{}: remote query reports {} records",
            self.object_type,
            cursor.total_size()
        );

        self.state = TaskState::Paging;
        let mut accumulator = BatchAccumulator::new(self.batch_size);
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let Some(records) = cursor.next_page().await? else {
                break;
            };
            for batch in accumulator.push(records) {
                self.flush_batch(&batch).await?;
            }
        }

        self.state = TaskState::Flushing;
        if let Some(batch) = accumulator.flush() {
            self.flush_batch(&batch).await?;
        }

        self.state = TaskState::Completed;
        Ok(())
    }

    /// Encode and upload one batch, then advance the part counters
    async fn flush_batch(&mut self, batch: &Batch) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let artifact = self
            .encoder
            .encode(&self.object_type, self.parts_flushed, batch)?;
        let location = self.uploader.upload(&artifact).await?;

        self.records_flushed += batch.len() as u64;
        self.parts_flushed += 1;
        self.locations.push(location);
        Ok(())
    }
}

// ============================================================================
// Export Orchestrator
// ============================================================================

/// Runs one export task per configured object type under a global
/// concurrency cap
pub struct ExportOrchestrator {
    config: Arc<ExportJobConfig>,
    api: Arc<dyn QueryApi>,
    uploader: Arc<ObjectStoreUploader>,
    cancel: CancellationToken,
}

impl ExportOrchestrator {
    /// Build an orchestrator from its parts
    ///
    /// The config must already be validated; [`ExportOrchestrator::connect`]
    /// does both.
    pub fn new(
        config: ExportJobConfig,
        api: Arc<dyn QueryApi>,
        uploader: Arc<ObjectStoreUploader>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            api,
            uploader,
            cancel: CancellationToken::new(),
        }
    }

    /// Validate the config and wire up the production client and store
    pub fn connect(config: ExportJobConfig) -> Result<Self> {
        config.validate()?;

        let api = Arc::new(SalesforceClient::new(config.credentials.clone()));
        let destination = Destination::parse(&config.bucket_url)?;
        let uploader = Arc::new(ObjectStoreUploader::new(
            destination,
            config.prefix.clone(),
            config.max_retries,
        ));
        Ok(Self::new(config, api, uploader))
    }

    /// A token that cancels the run when triggered
    ///
    /// On cancellation, in-flight uploads finish; no new pages or
    /// batches are started, and affected tasks report `Cancelled`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every configured object type to a terminal state
    ///
    /// The report holds one result per object type in configured order,
    /// regardless of completion order or individual failures.
    pub async fn run(&self) -> ExportReport {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        info!(
            "Exporting {} object types, {} concurrent",
            self.config.object_types.len(),
            self.config.max_concurrent
        );

        let mut handles = Vec::with_capacity(self.config.object_types.len());
        for object_type in &self.config.object_types {
            let name = object_type.clone();
            let object_type = object_type.clone();
            let semaphore = Arc::clone(&semaphore);
            let api = Arc::clone(&self.api);
            let uploader = Arc::clone(&self.uploader);
            let encoder = ColumnEncoder::new(self.config.compression, self.config.coercion);
            let batch_size = self.config.batch_size;
            let cancel = self.cancel.clone();

            let handle = tokio::spawn(async move {
                // Permit held until the task reaches a terminal state
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return cancelled_result(object_type),
                };
                if cancel.is_cancelled() {
                    return cancelled_result(object_type);
                }
                ObjectExportTask::new(object_type, api, uploader, encoder, batch_size, cancel)
                    .run()
                    .await
            });
            handles.push((name, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (object_type, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(ObjectExportResult::Failure {
                    object_type,
                    error: Error::Other(format!("export task panicked: {e}")),
                    records_flushed: 0,
                    parts_flushed: 0,
                }),
            }
        }

        ExportReport::new(results)
    }
}

/// Failure result for a task stopped before it started
fn cancelled_result(object_type: String) -> ObjectExportResult {
    ObjectExportResult::Failure {
        object_type,
        error: Error::Cancelled,
        records_flushed: 0,
        parts_flushed: 0,
    }
}

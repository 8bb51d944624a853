//! Result types for export runs

use crate::error::Error;

/// Lifecycle of one object-type export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Opening the remote query cursor
    Opening,
    /// Pulling pages and uploading full batches
    Paging,
    /// Flushing the final partial batch
    Flushing,
    /// Terminal: all parts uploaded
    Completed,
    /// Terminal: export aborted, partial counts retained
    Failed,
}

/// Outcome of one object-type export
///
/// A failure still reports the counts flushed before the error;
/// uploaded parts are never rolled back.
#[derive(Debug)]
pub enum ObjectExportResult {
    /// All records exported
    Success {
        /// Object type exported
        object_type: String,
        /// Records uploaded across all parts
        total_records: u64,
        /// Parts uploaded
        total_parts: u32,
        /// Storage location of each part, in part order
        locations: Vec<String>,
    },
    /// Export aborted before completion
    Failure {
        /// Object type that failed
        object_type: String,
        /// What went wrong
        error: Error,
        /// Records already uploaded before the failure
        records_flushed: u64,
        /// Parts already uploaded before the failure
        parts_flushed: u32,
    },
}

impl ObjectExportResult {
    /// The object type this result describes
    pub fn object_type(&self) -> &str {
        match self {
            Self::Success { object_type, .. } | Self::Failure { object_type, .. } => object_type,
        }
    }

    /// Whether the export completed
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Records uploaded, including partial counts on failure
    pub fn records_exported(&self) -> u64 {
        match self {
            Self::Success { total_records, .. } => *total_records,
            Self::Failure {
                records_flushed, ..
            } => *records_flushed,
        }
    }

    /// Parts uploaded, including partial counts on failure
    pub fn parts_exported(&self) -> u32 {
        match self {
            Self::Success { total_parts, .. } => *total_parts,
            Self::Failure { parts_flushed, .. } => *parts_flushed,
        }
    }
}

/// Aggregate report for one export run
///
/// Holds exactly one result per configured object type, in the
/// configured order, regardless of completion order or failures.
#[derive(Debug, Default)]
pub struct ExportReport {
    results: Vec<ObjectExportResult>,
}

impl ExportReport {
    /// Create a report from per-object results
    pub fn new(results: Vec<ObjectExportResult>) -> Self {
        Self { results }
    }

    /// Per-object results in configured order
    pub fn results(&self) -> &[ObjectExportResult] {
        &self.results
    }

    /// Whether any object type failed
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.is_success())
    }

    /// Records uploaded across all object types
    pub fn total_records(&self) -> u64 {
        self.results.iter().map(ObjectExportResult::records_exported).sum()
    }

    /// Parts uploaded across all object types
    pub fn total_parts(&self) -> u32 {
        self.results.iter().map(ObjectExportResult::parts_exported).sum()
    }
}

impl IntoIterator for ExportReport {
    type Item = ObjectExportResult;
    type IntoIter = std::vec::IntoIter<ObjectExportResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

//! Error taxonomy for the benchmark
//!
//! Three failure classes with different propagation rules:
//! - [`DatasetError`] is fatal: a run never starts on a bad dataset.
//! - [`InferenceError`] is per-record: the engine catches it and records a
//!   FAILED sentinel instead of aborting the run.
//! - [`ReportError`] is fatal to the output step only; the computed report
//!   stays available in memory for retry.

use thiserror::Error;

/// Dataset loading/validation failure. Aborts before any run starts.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record on line {line} has an empty point label")]
    EmptyPointLabel { line: usize },

    #[error("duplicate point label {label:?} in building {building:?} (line {line})")]
    DuplicatePointLabel {
        building: String,
        label: String,
        line: usize,
    },
}

/// Per-record prediction failure. Caught by the engine and sentineled.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("prediction timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("run cancelled before this record was predicted")]
    Cancelled,
}

/// Report persistence failure. The in-memory report survives it.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read report from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

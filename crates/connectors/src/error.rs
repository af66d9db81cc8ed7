use crate::file::csv::error::FileError;
use thiserror::Error;

/// Failures of the bulk runtime. All of them end the run.
#[derive(Debug, Error)]
pub enum BulkError {
    /// The wire client failed to talk to the remote system.
    #[error("Transport error: {0}")]
    Transport(String),

    /// File-backed transport error.
    #[error("File error: {0}")]
    File(#[from] FileError),

    /// A batch was still pending when the safety switch tripped.
    #[error("Batch {batch} did not complete after {polls} polls ({waited_ms} ms)")]
    Timeout {
        batch: usize,
        polls: u32,
        waited_ms: u128,
    },

    /// The remote system gave up on a whole batch.
    #[error("Batch {batch} failed: {message}")]
    BatchFailed { batch: usize, message: String },

    #[error("Batch index {index} out of range (job has {count} batches)")]
    BatchOutOfRange { index: usize, count: usize },

    #[error("No job has been submitted")]
    NotSubmitted,

    #[error("Bulk connection is closed")]
    Closed,
}

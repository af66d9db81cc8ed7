use crate::error::BulkError;
use async_trait::async_trait;
use model::{
    execution::job::{BulkJob, ConcurrencyMode},
    records::result_row::BulkResultRow,
};
use std::{fmt, str::FromStr};

/// Processing state of one batch as reported by the remote system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Queued,
    InProgress,
    Completed,
    Failed(String),
    /// The remote system skipped the batch; it has no result rows.
    NotProcessed,
}

impl FromStr for BatchState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (state, detail) = match s.split_once(':') {
            Some((state, detail)) => (state.trim(), detail.trim()),
            None => (s, ""),
        };

        match state.to_ascii_lowercase().as_str() {
            "queued" => Ok(BatchState::Queued),
            "inprogress" => Ok(BatchState::InProgress),
            "completed" => Ok(BatchState::Completed),
            "failed" => Ok(BatchState::Failed(detail.to_string())),
            "notprocessed" => Ok(BatchState::NotProcessed),
            _ => Err(format!("Unknown batch state: {s}")),
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::Queued => f.write_str("Queued"),
            BatchState::InProgress => f.write_str("InProgress"),
            BatchState::Completed => f.write_str("Completed"),
            BatchState::Failed(msg) => write!(f, "Failed: {msg}"),
            BatchState::NotProcessed => f.write_str("NotProcessed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInfo {
    pub id: String,
    pub index: usize,
}

/// Wire-level client for the remote bulk API.
///
/// Implementations only move data; waiting for batches to finish is the
/// job of [`crate::bulk::polling::PollingBulkRuntime`].
#[async_trait]
pub trait BulkTransport: Send {
    /// Creates the job, uploads its data and returns the remote job id.
    async fn create_job(
        &mut self,
        job: &BulkJob,
        mode: ConcurrencyMode,
    ) -> Result<String, BulkError>;

    /// Lists the job's batches in index order.
    async fn list_batches(&mut self, job_id: &str) -> Result<Vec<BatchInfo>, BulkError>;

    async fn batch_state(&mut self, job_id: &str, batch: &BatchInfo)
    -> Result<BatchState, BulkError>;

    /// Fetches the result log of a completed batch. When `key_field` is set
    /// every row carries that field's value as its business key.
    async fn fetch_log(
        &mut self,
        job_id: &str,
        batch: &BatchInfo,
        key_field: Option<&str>,
    ) -> Result<Vec<BulkResultRow>, BulkError>;

    async fn close(&mut self) -> Result<(), BulkError>;
}

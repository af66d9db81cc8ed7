use crate::{bulk::polling::PollSettings, error::BulkError};
use async_trait::async_trait;
use model::{
    execution::job::{BulkJob, ConcurrencyMode},
    records::result_row::BulkResultRow,
};

/// Submits a bulk job and hands back its per-batch result logs.
#[async_trait]
pub trait BulkRuntime: Send {
    fn set_concurrency_mode(&mut self, mode: ConcurrencyMode);

    fn set_poll_settings(&mut self, settings: PollSettings);

    async fn submit(&mut self, job: &BulkJob) -> Result<(), BulkError>;

    /// Number of batches of the submitted job.
    async fn batch_count(&mut self) -> Result<usize, BulkError>;

    /// Result rows of one batch, waiting for the batch to finish first.
    /// `key_field` requests the business-key enriched variant of the log.
    async fn batch_log(
        &mut self,
        batch_index: usize,
        key_field: Option<&str>,
    ) -> Result<Vec<BulkResultRow>, BulkError>;

    /// Releases the connection. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), BulkError>;
}

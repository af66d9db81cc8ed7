use crate::{
    bulk::{
        runtime::BulkRuntime,
        transport::{BatchInfo, BatchState, BulkTransport},
    },
    error::BulkError,
};
use async_trait::async_trait;
use model::{
    execution::job::{BulkJob, ConcurrencyMode},
    records::result_row::BulkResultRow,
};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How long to wait for a batch to finish on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between two state checks.
    pub await_time: Duration,
    /// Maximum number of state checks per batch; `None` waits forever.
    pub safety_switch: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            await_time: Duration::from_secs(10),
            safety_switch: Some(360),
        }
    }
}

/// [`BulkRuntime`] over a wire-level [`BulkTransport`], polling each
/// batch until it leaves the queued/in-progress states.
pub struct PollingBulkRuntime<T: BulkTransport> {
    transport: T,
    concurrency_mode: ConcurrencyMode,
    poll: PollSettings,
    job_id: Option<String>,
    batches: Vec<BatchInfo>,
    closed: bool,
}

impl<T: BulkTransport> PollingBulkRuntime<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            concurrency_mode: ConcurrencyMode::default(),
            poll: PollSettings::default(),
            job_id: None,
            batches: Vec::new(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn job_id(&self) -> Result<&str, BulkError> {
        if self.closed {
            return Err(BulkError::Closed);
        }
        self.job_id.as_deref().ok_or(BulkError::NotSubmitted)
    }

    /// Blocks until the batch is done. `Ok(false)` means the remote system
    /// skipped it and there is no log to fetch.
    async fn await_batch(&mut self, job_id: &str, batch: &BatchInfo) -> Result<bool, BulkError> {
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            let state = self.transport.batch_state(job_id, batch).await?;
            polls += 1;

            match state {
                BatchState::Completed => return Ok(true),
                BatchState::NotProcessed => {
                    debug!("Batch {} was not processed; treating it as empty", batch.index);
                    return Ok(false);
                }
                BatchState::Failed(message) => {
                    return Err(BulkError::BatchFailed {
                        batch: batch.index,
                        message,
                    });
                }
                BatchState::Queued | BatchState::InProgress => {
                    if let Some(max_polls) = self.poll.safety_switch
                        && polls >= max_polls
                    {
                        warn!(
                            "Safety switch tripped for batch {} after {} polls",
                            batch.index, polls
                        );
                        return Err(BulkError::Timeout {
                            batch: batch.index,
                            polls,
                            waited_ms: started.elapsed().as_millis(),
                        });
                    }

                    debug!(
                        "Batch {} is {}; checking again in {:?}",
                        batch.index, state, self.poll.await_time
                    );
                    sleep(self.poll.await_time).await;
                }
            }
        }
    }
}

#[async_trait]
impl<T: BulkTransport> BulkRuntime for PollingBulkRuntime<T> {
    fn set_concurrency_mode(&mut self, mode: ConcurrencyMode) {
        self.concurrency_mode = mode;
    }

    fn set_poll_settings(&mut self, settings: PollSettings) {
        self.poll = settings;
    }

    async fn submit(&mut self, job: &BulkJob) -> Result<(), BulkError> {
        if self.closed {
            return Err(BulkError::Closed);
        }

        let job_id = self
            .transport
            .create_job(job, self.concurrency_mode)
            .await?;
        let batches = self.transport.list_batches(&job_id).await?;

        info!(
            "Submitted {} job on '{}' as {} ({} batches, {} mode)",
            job.operation(),
            job.module,
            job_id,
            batches.len(),
            self.concurrency_mode
        );

        self.job_id = Some(job_id);
        self.batches = batches;
        Ok(())
    }

    async fn batch_count(&mut self) -> Result<usize, BulkError> {
        self.job_id()?;
        Ok(self.batches.len())
    }

    async fn batch_log(
        &mut self,
        batch_index: usize,
        key_field: Option<&str>,
    ) -> Result<Vec<BulkResultRow>, BulkError> {
        let job_id = self.job_id()?.to_string();
        let batch = self
            .batches
            .get(batch_index)
            .cloned()
            .ok_or(BulkError::BatchOutOfRange {
                index: batch_index,
                count: self.batches.len(),
            })?;

        if !self.await_batch(&job_id, &batch).await? {
            return Ok(Vec::new());
        }

        self.transport.fetch_log(&job_id, &batch, key_field).await
    }

    async fn close(&mut self) -> Result<(), BulkError> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.transport.close().await
    }
}

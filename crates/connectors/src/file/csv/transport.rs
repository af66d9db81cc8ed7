use crate::{
    bulk::transport::{BatchInfo, BatchState, BulkTransport},
    error::BulkError,
    file::csv::error::FileError,
};
use async_trait::async_trait;
use model::{
    execution::job::{BulkJob, ConcurrencyMode},
    records::result_row::BulkResultRow,
};
use std::{
    collections::{BTreeSet, HashMap},
    path::PathBuf,
};
use tracing::{debug, info, warn};

const BATCH_PREFIX: &str = "batch_";
const LOG_EXTENSION: &str = "csv";
const STATE_EXTENSION: &str = "state";

/// Serves batch result logs from a directory, one `batch_<n>.csv` per batch.
///
/// A `batch_<n>.state` file next to a log overrides the batch state
/// (`Queued`, `InProgress`, `Failed: <reason>`, `NotProcessed`); without
/// one a batch with a log is `Completed`.
pub struct CsvLogTransport {
    dir: PathBuf,
}

impl CsvLogTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvLogTransport { dir: dir.into() }
    }

    fn log_path(&self, batch: &BatchInfo) -> PathBuf {
        self.dir.join(format!("{}.{LOG_EXTENSION}", batch.id))
    }

    fn state_path(&self, batch: &BatchInfo) -> PathBuf {
        self.dir.join(format!("{}.{STATE_EXTENSION}", batch.id))
    }

    /// Batch index encoded in a file name such as `batch_12.csv`.
    fn batch_index(file_name: &str) -> Option<usize> {
        let (stem, ext) = file_name.rsplit_once('.')?;
        if ext != LOG_EXTENSION && ext != STATE_EXTENSION {
            return None;
        }
        stem.strip_prefix(BATCH_PREFIX)?.parse().ok()
    }

    fn parse_log(bytes: &[u8], key_field: Option<&str>) -> Result<Vec<BulkResultRow>, FileError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(bytes);

        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();

        for record in reader.records() {
            let row = match record {
                Ok(record) => BulkResultRow::from_log_record(headers.iter().zip(record.iter())),
                Err(err) if is_malformed_line(&err) => {
                    warn!("Rejecting malformed result log line: {}", err);
                    BulkResultRow::new(
                        HashMap::new(),
                        false,
                        Some(format!("Malformed result log line: {err}")),
                    )
                }
                Err(err) => return Err(err.into()),
            };
            rows.push(match key_field {
                Some(key) => row.with_business_key(key),
                None => row,
            });
        }

        Ok(rows)
    }
}

/// Errors confined to one log line; the reader can carry on past them.
fn is_malformed_line(err: &csv::Error) -> bool {
    matches!(
        err.kind(),
        csv::ErrorKind::UnequalLengths { .. } | csv::ErrorKind::Utf8 { .. }
    )
}

#[async_trait]
impl BulkTransport for CsvLogTransport {
    async fn create_job(
        &mut self,
        job: &BulkJob,
        mode: ConcurrencyMode,
    ) -> Result<String, BulkError> {
        if !tokio::fs::try_exists(&self.dir)
            .await
            .map_err(FileError::from)?
        {
            return Err(FileError::NotFound(self.dir.display().to_string()).into());
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        info!(
            "Reading {} results for '{}' from {} ({} mode)",
            job.operation(),
            job.module,
            self.dir.display(),
            mode
        );
        Ok(job_id)
    }

    async fn list_batches(&mut self, _job_id: &str) -> Result<Vec<BatchInfo>, BulkError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(FileError::from)?;

        let mut indexes = BTreeSet::new();
        while let Some(entry) = entries.next_entry().await.map_err(FileError::from)? {
            if let Some(index) = entry.file_name().to_str().and_then(Self::batch_index) {
                indexes.insert(index);
            }
        }

        // Batch indexes must be dense: a gap means a lost log
        let batches = indexes
            .into_iter()
            .enumerate()
            .map(|(position, index)| {
                if position == index {
                    Ok(BatchInfo {
                        id: format!("{BATCH_PREFIX}{index}"),
                        index,
                    })
                } else {
                    Err(FileError::InvalidFormat(format!(
                        "missing result log for batch {position} in {}",
                        self.dir.display()
                    )))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }

    async fn batch_state(
        &mut self,
        _job_id: &str,
        batch: &BatchInfo,
    ) -> Result<BatchState, BulkError> {
        let state_path = self.state_path(batch);

        match tokio::fs::read_to_string(&state_path).await {
            Ok(content) => content.parse::<BatchState>().map_err(|_| {
                BulkError::from(FileError::InvalidState {
                    file: state_path.display().to_string(),
                    state: content.trim().to_string(),
                })
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BatchState::Completed),
            Err(e) => Err(FileError::from(e).into()),
        }
    }

    async fn fetch_log(
        &mut self,
        _job_id: &str,
        batch: &BatchInfo,
        key_field: Option<&str>,
    ) -> Result<Vec<BulkResultRow>, BulkError> {
        let path = self.log_path(batch);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FileError::NotFound(path.display().to_string()).into());
            }
            Err(e) => return Err(FileError::from(e).into()),
        };

        let rows = Self::parse_log(&bytes, key_field)?;
        debug!("Read {} result rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    async fn close(&mut self) -> Result<(), BulkError> {
        Ok(())
    }
}

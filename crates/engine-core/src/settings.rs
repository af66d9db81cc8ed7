use crate::error::ReaderError;
use connectors::bulk::polling::PollSettings;
use model::{
    execution::job::{BulkJob, ConcurrencyMode, OutputAction},
    schema::Schema,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Everything a result-reading run is configured with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderSettings {
    pub job: BulkJob,
    /// Echo the upsert key of rejected rows. Only honoured for upserts.
    pub output_upsert_key: bool,
    pub concurrency_mode: ConcurrencyMode,
    /// Delay between two batch state checks.
    pub await_time_ms: u64,
    /// Maximum state checks per batch; `null` waits without bound.
    pub safety_switch: Option<u32>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        let poll = PollSettings::default();
        ReaderSettings {
            job: BulkJob::default(),
            output_upsert_key: false,
            concurrency_mode: ConcurrencyMode::default(),
            await_time_ms: poll.await_time.as_millis() as u64,
            safety_switch: poll.safety_switch,
        }
    }
}

impl ReaderSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            await_time: Duration::from_millis(self.await_time_ms),
            safety_switch: self.safety_switch,
        }
    }

    /// Field whose value rejected rows carry as their business key, if the
    /// run asked for it.
    pub fn business_key_field(&self) -> Option<&str> {
        if self.job.action == OutputAction::Upsert && self.output_upsert_key {
            self.job.upsert_key_column.as_deref()
        } else {
            None
        }
    }

    pub fn validate(&self, schema: &Schema) -> Result<(), ReaderError> {
        if schema.is_empty() {
            return Err(ReaderError::Config("schema has no fields".into()));
        }

        if self.job.module.trim().is_empty() {
            return Err(ReaderError::Config("module name is required".into()));
        }

        let key_column = self
            .job
            .upsert_key_column
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());
        if self.job.action == OutputAction::Upsert && key_column.is_none() {
            return Err(ReaderError::Config(
                "upsert requires an upsert key column".into(),
            ));
        }

        if self.job.hard_delete && self.job.action != OutputAction::Delete {
            return Err(ReaderError::Config(format!(
                "hard delete is only valid for delete jobs, not {}",
                self.job.action
            )));
        }

        if self.job.rows_to_commit == 0 || self.job.bytes_to_commit == 0 {
            return Err(ReaderError::Config(
                "rows_to_commit and bytes_to_commit must be positive".into(),
            ));
        }

        match (self.await_time_ms, self.safety_switch) {
            (_, Some(0)) => {
                return Err(ReaderError::Config(
                    "safety_switch must allow at least one state check".into(),
                ));
            }
            (0, None) => {
                return Err(ReaderError::Config(
                    "await_time_ms must be positive when safety_switch is unbounded".into(),
                ));
            }
            _ => {}
        }

        Ok(())
    }
}

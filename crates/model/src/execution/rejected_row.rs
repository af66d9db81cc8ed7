use crate::{core::value::Value, records::row::RowData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A row the remote system (or the local conversion) refused.
///
/// Carries everything a downstream error channel needs to correlate the
/// rejection with its source data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RejectedRow {
    pub id: String,
    /// Best-effort conversion of the row; may be partial.
    pub record: RowData,
    pub error: String,
    /// Only set when business-key output was requested for the run.
    pub business_key: Option<String>,
    pub batch_index: Option<usize>,
    pub row_index: Option<usize>,
    pub rejected_at: DateTime<Utc>,
}

impl RejectedRow {
    pub fn new(record: RowData, error: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            record,
            error,
            business_key: None,
            batch_index: None,
            row_index: None,
            rejected_at: Utc::now(),
        }
    }

    pub fn with_business_key(mut self, business_key: Option<String>) -> Self {
        self.business_key = business_key;
        self
    }

    /// Position of the row inside the job's result logs.
    pub fn with_position(mut self, batch_index: usize, row_index: usize) -> Self {
        self.batch_index = Some(batch_index);
        self.row_index = Some(row_index);
        self
    }

    /// Flattened form for writing to a table or file.
    pub fn to_storage_map(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();

        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("error".to_string(), Value::String(self.error.clone()));
        map.insert(
            "rejected_at".to_string(),
            Value::String(self.rejected_at.to_rfc3339()),
        );
        map.insert("record".to_string(), Value::Json(self.record.to_json()));

        if let Some(key) = &self.business_key {
            map.insert("upsert_column_value".to_string(), Value::String(key.clone()));
        }

        if let Some(batch_index) = self.batch_index {
            map.insert("batch_index".to_string(), Value::Int(batch_index as i64));
        }

        if let Some(row_index) = self.row_index {
            map.insert("row_index".to_string(), Value::Int(row_index as i64));
        }

        map
    }
}

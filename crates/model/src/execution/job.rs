use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_BYTES_TO_COMMIT: u64 = 10 * 1024 * 1024;
const DEFAULT_ROWS_TO_COMMIT: u64 = 10_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputAction {
    #[default]
    Insert,
    Update,
    Upsert,
    Delete,
}

impl OutputAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputAction::Insert => "insert",
            OutputAction::Update => "update",
            OutputAction::Upsert => "upsert",
            OutputAction::Delete => "delete",
        }
    }
}

impl fmt::Display for OutputAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the remote system processes the job's batches. Opaque to the reader.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    Serial,
    #[default]
    Parallel,
}

impl fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyMode::Serial => f.write_str("Serial"),
            ConcurrencyMode::Parallel => f.write_str("Parallel"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Csv,
}

/// Description of a bulk load job as handed to the runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BulkJob {
    /// Target object / module name on the remote side.
    pub module: String,
    pub action: OutputAction,
    pub hard_delete: bool,
    pub upsert_key_column: Option<String>,
    pub content_type: ContentType,
    pub source_path: String,
    pub bytes_to_commit: u64,
    pub rows_to_commit: u64,
}

impl Default for BulkJob {
    fn default() -> Self {
        BulkJob {
            module: String::new(),
            action: OutputAction::default(),
            hard_delete: false,
            upsert_key_column: None,
            content_type: ContentType::default(),
            source_path: String::new(),
            bytes_to_commit: DEFAULT_BYTES_TO_COMMIT,
            rows_to_commit: DEFAULT_ROWS_TO_COMMIT,
        }
    }
}

impl BulkJob {
    /// Operation name as the remote API spells it.
    pub fn operation(&self) -> &'static str {
        match (self.action, self.hard_delete) {
            (OutputAction::Delete, true) => "hardDelete",
            (action, _) => action.as_str(),
        }
    }
}

use connectors::error::BulkError;
use model::records::row::RowData;
use thiserror::Error;

/// Stream-fatal failures returned by `start()` / `advance()`.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error(transparent)]
    Transport(BulkError),

    #[error("Timed out waiting for batch {batch} after {polls} polls ({waited_ms} ms)")]
    Timeout {
        batch: usize,
        polls: u32,
        waited_ms: u128,
    },

    #[error("Invalid reader configuration: {0}")]
    Config(String),
}

impl From<BulkError> for ReaderError {
    fn from(err: BulkError) -> Self {
        match err {
            BulkError::Timeout {
                batch,
                polls,
                waited_ms,
            } => ReaderError::Timeout {
                batch,
                polls,
                waited_ms,
            },
            other => ReaderError::Transport(other),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("required field '{field}' is missing from the row")]
    MissingField { field: String },

    #[error("field '{field}' is not nullable but has no value")]
    NullNotAllowed { field: String },

    #[error("field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// A row that does not fit the schema. Row-local: it becomes a rejection,
/// never a stream failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row does not match schema: {}", join_errors(.errors))]
pub struct ConversionError {
    /// Every field that did convert; the failed ones are absent.
    pub partial: RowData,
    pub errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

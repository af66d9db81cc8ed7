use thiserror::Error;

/// Failures of the file-backed result log transport.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("Result log not found: {0}")]
    NotFound(String),
    #[error("Malformed result log directory: {0}")]
    InvalidFormat(String),
    #[error("Unrecognised batch state in {file}: '{state}'")]
    InvalidState { file: String, state: String },
    #[error("I/O error while reading result logs: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Result log is not valid CSV: {0}")]
    CsvError(#[from] csv::Error),
}

use engine_core::error::ReaderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to deserialize {file} as JSON: {source}")]
    ConfigDeserialize {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Failed to read bulk results: {0}")]
    Reader(#[from] ReaderError),

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),
}

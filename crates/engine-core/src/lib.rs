pub mod convert;
pub mod counters;
pub mod drain;
pub mod error;
pub mod reader;
pub mod router;
pub mod settings;

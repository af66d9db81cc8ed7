use crate::error::ConversionError;
use model::{
    execution::rejected_row::RejectedRow,
    records::{outcome::Outcome, result_row::BulkResultRow, row::RowData},
};
use tracing::warn;

/// Decides accept vs reject for one row. Never fails: a rejection is a
/// value handed to the caller, not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeRouter {
    business_key_output: bool,
}

impl OutcomeRouter {
    pub fn new(business_key_output: bool) -> Self {
        OutcomeRouter {
            business_key_output,
        }
    }

    pub fn route(
        &self,
        row: &BulkResultRow,
        converted: Result<RowData, ConversionError>,
        batch_index: usize,
        row_index: usize,
    ) -> Outcome {
        let (record, error) = match (row.is_success(), converted) {
            (true, Ok(record)) => return Outcome::Accepted(record),
            (true, Err(err)) => {
                warn!(
                    "Row {} of batch {} was accepted remotely but does not match the schema: {}",
                    row_index, batch_index, err
                );
                let message = err.to_string();
                (err.partial, message)
            }
            (false, converted) => {
                let record = converted.unwrap_or_else(|err| err.partial);
                (record, row.error().unwrap_or_default().to_string())
            }
        };

        let business_key = if self.business_key_output {
            row.business_key().map(str::to_string)
        } else {
            None
        };

        Outcome::Rejected(
            RejectedRow::new(record, error)
                .with_business_key(business_key)
                .with_position(batch_index, row_index),
        )
    }
}

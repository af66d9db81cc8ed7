use crate::{execution::rejected_row::RejectedRow, records::row::RowData};

/// Per-row classification. A rejection is data, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(RowData),
    Rejected(RejectedRow),
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    pub fn record(&self) -> &RowData {
        match self {
            Outcome::Accepted(record) => record,
            Outcome::Rejected(rejected) => &rejected.record,
        }
    }

    pub fn as_rejected(&self) -> Option<&RejectedRow> {
        match self {
            Outcome::Accepted(_) => None,
            Outcome::Rejected(rejected) => Some(rejected),
        }
    }
}

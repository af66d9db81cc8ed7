use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column carrying the remote system's per-row success marker.
pub const SUCCESS_COLUMN: &str = "Success";
/// Column carrying the remote system's per-row error text.
pub const ERROR_COLUMN: &str = "Error";

/// One raw row of a batch result log.
///
/// The loosely-typed `Success` / `Error` columns are lifted into typed
/// fields when the row is ingested, so nothing downstream re-derives them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BulkResultRow {
    values: HashMap<String, String>,
    success: bool,
    error: Option<String>,
    business_key: Option<String>,
}

impl BulkResultRow {
    pub fn new(values: HashMap<String, String>, success: bool, error: Option<String>) -> Self {
        BulkResultRow {
            values,
            success,
            error: error.filter(|e| !e.is_empty()),
            business_key: None,
        }
    }

    /// Builds a row from the raw `(column, value)` pairs of a result log.
    pub fn from_log_record<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = HashMap::new();
        let mut success = false;
        let mut error = None;

        for (column, value) in pairs {
            let column = column.into();
            let value = value.into();

            if column.eq_ignore_ascii_case(SUCCESS_COLUMN) {
                success = value.trim().eq_ignore_ascii_case("true");
            } else if column.eq_ignore_ascii_case(ERROR_COLUMN) {
                error = Some(value);
            } else {
                values.insert(column, value);
            }
        }

        BulkResultRow::new(values, success, error)
    }

    /// Lifts the value of `key_field` into the out-of-band business key slot.
    pub fn with_business_key(mut self, key_field: &str) -> Self {
        self.business_key = self.get(key_field).map(str::to_string);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn business_key(&self) -> Option<&str> {
        self.business_key.as_deref()
    }

    /// Field lookup; exact match first, then case-insensitive since the
    /// remote system treats field API names case-insensitively.
    pub fn get(&self, field: &str) -> Option<&str> {
        if let Some(value) = self.values.get(field) {
            return Some(value.as_str());
        }

        self.values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field))
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

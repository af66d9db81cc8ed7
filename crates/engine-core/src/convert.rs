use crate::error::{ConversionError, FieldError};
use model::{
    core::value::{FieldValue, Value},
    records::{result_row::BulkResultRow, row::RowData},
    schema::Schema,
};
use std::sync::Arc;

/// Maps raw result rows onto the run's schema.
#[derive(Debug, Clone)]
pub struct RowConverter {
    entity: String,
    schema: Arc<Schema>,
}

impl RowConverter {
    pub fn new(entity: &str, schema: Arc<Schema>) -> Self {
        RowConverter {
            entity: entity.to_string(),
            schema,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Resolves every schema field to a typed value or an explicit absence.
    /// On failure the error still carries the fields that did convert.
    pub fn convert(&self, row: &BulkResultRow) -> Result<RowData, ConversionError> {
        let mut field_values = Vec::with_capacity(self.schema.len());
        let mut errors = Vec::new();

        for field in self.schema.fields() {
            let value = match row.get(&field.name) {
                None if field.nullable => None,
                None => {
                    errors.push(FieldError::MissingField {
                        field: field.name.clone(),
                    });
                    None
                }
                Some(raw) => match field.data_type.parse_value(raw) {
                    Ok(Value::Null) if !field.nullable => {
                        errors.push(FieldError::NullNotAllowed {
                            field: field.name.clone(),
                        });
                        None
                    }
                    Ok(Value::Null) => None,
                    Ok(value) => Some(value),
                    Err(reason) => {
                        errors.push(FieldError::InvalidValue {
                            field: field.name.clone(),
                            reason,
                        });
                        None
                    }
                },
            };

            field_values.push(FieldValue::new(&field.name, value, field.data_type.clone()));
        }

        let record = RowData::new(&self.entity, field_values);
        if errors.is_empty() {
            Ok(record)
        } else {
            Err(ConversionError {
                partial: record,
                errors,
            })
        }
    }
}

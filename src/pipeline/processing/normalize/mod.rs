//! Field normalization: raw JSON rows in, typed records out.
//!
//! Each cell is cleaned (whitespace, dash lists, phone digits), checked
//! against the recognized null spellings, then coerced to the column's
//! declared type. Strict mode fails the run on the first unparsable cell;
//! lenient mode records an audit entry and moves on with an absent value.

pub mod cleaning;
pub mod scrub;

use serde_json::Value;
use tracing::{debug, info};

use crate::common::constants::{DATE_FORMATS, MONTH_YEAR_FORMAT};
use crate::domain::{CellValue, TypedRecord};
use crate::error::{PipelineError, Result};
use crate::observability::metrics::normalize as normalize_metrics;
use crate::pipeline::ingestion::{RawBatch, RawRecord};
use crate::pipeline::processing::audit::{AuditAction, AuditEntry, AuditLog};
use crate::registry::{CleanStyle, ColumnSpec, ColumnType, NullPolicy, SchemaRegistry, TableSchema};

pub struct FieldNormalizer<'a> {
    registry: &'a SchemaRegistry,
    strict: bool,
}

impl<'a> FieldNormalizer<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            strict: registry.is_strict(),
        }
    }

    /// Normalize a whole raw batch against its table's schema.
    pub fn normalize_batch(
        &self,
        batch: &RawBatch,
        audit: &mut AuditLog,
    ) -> Result<Vec<TypedRecord>> {
        let schema = self.registry.table(&batch.table);
        let mut records = Vec::with_capacity(batch.records.len());
        for (row, raw) in batch.records.iter().enumerate() {
            records.push(self.normalize_record(&batch.table, schema, row, raw, audit)?);
        }
        normalize_metrics::records_processed(records.len() as u64);
        normalize_metrics::batch_size(records.len());
        info!(
            "🔧 Normalized {} record(s) for table '{}'",
            records.len(),
            batch.table
        );
        Ok(records)
    }

    pub fn normalize_record(
        &self,
        table: &str,
        schema: Option<&TableSchema>,
        row: usize,
        raw: &RawRecord,
        audit: &mut AuditLog,
    ) -> Result<TypedRecord> {
        let mut record = TypedRecord::new();
        for (raw_name, value) in raw {
            let column = cleaning::cleanse_column_name(raw_name);
            let spec = schema.and_then(|s| s.column(&column));
            let cell = self.coerce_cell(table, &column, spec, row, value, audit)?;
            record.insert(column, cell);
        }
        Ok(record)
    }

    fn coerce_cell(
        &self,
        table: &str,
        column: &str,
        spec: Option<&ColumnSpec>,
        row: usize,
        value: &Value,
        audit: &mut AuditLog,
    ) -> Result<CellValue> {
        let null_policy = spec.map(|s| s.null_policy).unwrap_or_default();
        let clean_style = spec.map(|s| s.clean).unwrap_or_default();

        match value {
            // Upstream missing marker; same fate as the null spellings
            Value::Null => {
                normalize_metrics::null_unified();
                Ok(CellValue::Absent)
            }
            Value::String(text) => {
                if cleaning::is_null_spelling(text) {
                    if text.trim().is_empty() && null_policy == NullPolicy::PreserveEmpty {
                        return Ok(CellValue::Text(String::new()));
                    }
                    normalize_metrics::null_unified();
                    return Ok(CellValue::Absent);
                }
                let cleaned = match clean_style {
                    CleanStyle::Standard => cleaning::clean_text(text),
                    CleanStyle::DashList => cleaning::clean_dash_text(text),
                    CleanStyle::Phone => cleaning::clean_phone(text),
                };
                if cleaned.is_empty() && null_policy == NullPolicy::Unify {
                    normalize_metrics::null_unified();
                    return Ok(CellValue::Absent);
                }
                self.coerce_text(table, column, spec, row, cleaned, audit)
            }
            Value::Number(n) => {
                let Some(number) = n.as_f64() else {
                    return self.coercion_failure(table, column, row, &n.to_string(), "number", audit);
                };
                match spec {
                    None => Ok(CellValue::Number(number)),
                    Some(spec) if spec.financial => Ok(CellValue::Number(number)),
                    Some(spec) => match spec.column_type {
                        ColumnType::Number => Ok(CellValue::Number(number)),
                        ColumnType::Text => Ok(CellValue::Text(n.to_string())),
                        ColumnType::Bool if number == 1.0 => Ok(CellValue::Bool(true)),
                        ColumnType::Bool if number == 0.0 => Ok(CellValue::Bool(false)),
                        ColumnType::Bool => {
                            self.coercion_failure(table, column, row, &n.to_string(), "bool", audit)
                        }
                        ColumnType::Date => {
                            self.coercion_failure(table, column, row, &n.to_string(), "date", audit)
                        }
                    },
                }
            }
            Value::Bool(b) => match spec.map(|s| s.column_type) {
                None | Some(ColumnType::Bool) => Ok(CellValue::Bool(*b)),
                Some(ColumnType::Text) => Ok(CellValue::Text(b.to_string())),
                Some(ColumnType::Number) => {
                    self.coercion_failure(table, column, row, &b.to_string(), "number", audit)
                }
                Some(ColumnType::Date) => {
                    self.coercion_failure(table, column, row, &b.to_string(), "date", audit)
                }
            },
            // Nested structures never belong in a spreadsheet cell
            Value::Array(_) | Value::Object(_) => {
                let expected = spec
                    .map(|s| declared_type_name(s.column_type))
                    .unwrap_or("text");
                self.coercion_failure(table, column, row, &value.to_string(), expected, audit)
            }
        }
    }

    fn coerce_text(
        &self,
        table: &str,
        column: &str,
        spec: Option<&ColumnSpec>,
        row: usize,
        text: String,
        audit: &mut AuditLog,
    ) -> Result<CellValue> {
        let Some(spec) = spec else {
            // Undeclared columns pass through as cleaned text
            return Ok(CellValue::Text(text));
        };
        if spec.financial {
            // Mixed money cells belong to the scrub pass; hand the text on
            return Ok(CellValue::Text(text));
        }
        match spec.column_type {
            ColumnType::Text => Ok(CellValue::Text(text)),
            ColumnType::Number => match cleaning::clean_numeric(&text) {
                Some(number) => {
                    normalize_metrics::cell_coerced();
                    Ok(CellValue::Number(number))
                }
                None => self.coercion_failure(table, column, row, &text, "number", audit),
            },
            ColumnType::Date => {
                let parsed = match &spec.formats {
                    Some(formats) => cleaning::parse_date(&text, formats),
                    None => cleaning::parse_date(&text, &DATE_FORMATS)
                        .or_else(|| cleaning::parse_date_with(text.trim(), MONTH_YEAR_FORMAT)),
                };
                match parsed {
                    Some(date) => {
                        normalize_metrics::cell_coerced();
                        Ok(CellValue::Date(date))
                    }
                    None => self.coercion_failure(table, column, row, &text, "date", audit),
                }
            }
            ColumnType::Bool => match cleaning::parse_bool(&text) {
                Some(flag) => {
                    normalize_metrics::cell_coerced();
                    Ok(CellValue::Bool(flag))
                }
                None => self.coercion_failure(table, column, row, &text, "bool", audit),
            },
        }
    }

    fn coercion_failure(
        &self,
        table: &str,
        column: &str,
        row: usize,
        raw: &str,
        expected: &str,
        audit: &mut AuditLog,
    ) -> Result<CellValue> {
        normalize_metrics::coercion_failure();
        if self.strict {
            return Err(PipelineError::TypeCoercion {
                table: table.to_string(),
                column: column.to_string(),
                row,
                value: raw.to_string(),
                expected: expected.to_string(),
            });
        }
        debug!(
            "Could not coerce {}.{} row {} value '{}' to {}; treating as absent",
            table, column, row, raw, expected
        );
        audit.record(
            AuditEntry::new(AuditAction::CoercionFallback, table, row)
                .with_column(column)
                .with_change(raw, "")
                .with_note(&format!("could not parse as {}", expected)),
        );
        Ok(CellValue::Absent)
    }
}

fn declared_type_name(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Text => "text",
        ColumnType::Number => "number",
        ColumnType::Date => "date",
        ColumnType::Bool => "bool",
    }
}

//! Financial scrub: the row-level pass over money columns.
//!
//! Deal teams type things like `1,200 LTM CAD` into amount cells. This pass
//! splits such cells into their numeric value and narrative remainder,
//! converts CAD to USD, parks the narrative in the row's Notes column, and
//! relocates trailing-twelve-month figures into the canonical LTM columns.
//! Every touched cell lands in the audit log.

use tracing::info;

use crate::common::constants::{LTM_EBITDA_COLUMN, LTM_REVENUE_COLUMN, NOTES_COLUMN};
use crate::domain::{CellValue, TypedRecord};
use crate::observability::metrics::financials as financial_metrics;
use crate::pipeline::processing::audit::{AuditAction, AuditEntry, AuditLog};
use crate::registry::TableSchema;

use super::cleaning;

/// Cell text tagging a value as a trailing-twelve-month figure sends it to
/// the canonical column for that metric.
fn find_target_column(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    if lowered.contains("ltm") {
        return Some(LTM_EBITDA_COLUMN);
    }
    if lowered.contains("ttm") {
        return Some(LTM_REVENUE_COLUMN);
    }
    None
}

pub struct FinancialScrubber {
    cad_to_usd: f64,
}

impl FinancialScrubber {
    pub fn new(cad_to_usd: f64) -> Self {
        Self { cad_to_usd }
    }

    /// Scrub every flagged column of every record, in place. Columns are
    /// visited in row order so note accumulation stays deterministic.
    pub fn scrub_table(
        &self,
        table: &str,
        schema: Option<&TableSchema>,
        records: &mut [TypedRecord],
        audit: &mut AuditLog,
    ) {
        let Some(schema) = schema else { return };
        if !schema.columns.values().any(|spec| spec.financial) {
            return;
        }

        let mut scrubbed = 0usize;
        for (row, record) in records.iter_mut().enumerate() {
            if !record.contains(NOTES_COLUMN) {
                record.insert(NOTES_COLUMN, CellValue::Absent);
            }

            let columns: Vec<String> = record
                .column_names()
                .filter(|name| schema.column(name).map(|s| s.financial).unwrap_or(false))
                .map(str::to_string)
                .collect();

            for column in columns {
                if self.scrub_cell(table, row, &column, record, audit) {
                    scrubbed += 1;
                }
            }
        }

        if scrubbed > 0 {
            info!(
                "💰 Scrubbed {} financial cell(s) in table '{}'",
                scrubbed, table
            );
        }
    }

    fn scrub_cell(
        &self,
        table: &str,
        row: usize,
        column: &str,
        record: &mut TypedRecord,
        audit: &mut AuditLog,
    ) -> bool {
        let Some(cell) = record.get(column) else {
            return false;
        };
        if cell.is_absent() {
            return false;
        }

        let original_display = cell.to_string();
        let extracted = cleaning::extract_text_content(&original_display);
        let is_cad = cleaning::is_cad_currency(&original_display);
        let mut numeric = match cell {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => cleaning::clean_numeric(s),
            _ => None,
        };

        if is_cad {
            if let Some(value) = numeric.as_mut() {
                *value *= self.cad_to_usd;
                financial_metrics::currency_converted();
            }
        }

        let new_cell = match numeric {
            Some(value) => CellValue::Number(value),
            None => CellValue::Absent,
        };
        record.insert(column.to_string(), new_cell.clone());

        let mut notes = Vec::new();
        if !extracted.is_empty() {
            notes.push(format!("{}: {}", column, extracted));
        }
        if is_cad {
            notes.push("originally stored as CAD".to_string());
        }
        let note_added = if notes.is_empty() {
            None
        } else {
            let joined = notes.join("; ");
            append_note(record, &joined);
            financial_metrics::notes_relocated();
            Some(joined)
        };

        let target = find_target_column(&extracted);
        if let Some(target_column) = target {
            record.insert(target_column, new_cell.clone());
        }

        let mut entry = AuditEntry::new(AuditAction::ValueScrubbed, table, row)
            .with_column(column)
            .with_change(&original_display, &new_cell.to_string());
        if let Some(note) = &note_added {
            entry = entry.with_note(note);
        }
        if let Some(target_column) = target {
            entry = entry.with_migrated_to(target_column);
        }
        audit.record(entry);
        financial_metrics::audit_entry();
        true
    }
}

fn append_note(record: &mut TypedRecord, note: &str) {
    let updated = match record.get(NOTES_COLUMN) {
        Some(CellValue::Text(existing)) if !existing.is_empty() => {
            format!("{}; {}", existing, note)
        }
        _ => note.to_string(),
    };
    record.insert(NOTES_COLUMN, CellValue::Text(updated));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaRegistry;
    use uuid::Uuid;

    fn financial_schema() -> SchemaRegistry {
        let registry: SchemaRegistry = toml::from_str(
            r#"
            [tables.deals.columns."Deal Size"]
            type = "number"
            financial = true
            [tables.deals.columns."Revenue"]
            type = "number"
            financial = true
        "#,
        )
        .unwrap();
        registry
    }

    fn record_with(column: &str, cell: CellValue) -> TypedRecord {
        let mut record = TypedRecord::new();
        record.insert(column, cell);
        record
    }

    #[test]
    fn cad_cells_convert_and_annotate() {
        let registry = financial_schema();
        let scrubber = FinancialScrubber::new(0.73);
        let mut audit = AuditLog::new(Uuid::new_v4());
        let mut records = vec![record_with(
            "Deal Size",
            CellValue::Text("1,200 LTM CAD".to_string()),
        )];

        scrubber.scrub_table("deals", registry.table("deals"), &mut records, &mut audit);

        let record = &records[0];
        let value = record.get("Deal Size").unwrap().as_number().unwrap();
        assert!((value - 876.0).abs() < 1e-9);

        // LTM marker relocates the converted value as well
        let relocated = record.get(LTM_EBITDA_COLUMN).unwrap().as_number().unwrap();
        assert!((relocated - 876.0).abs() < 1e-9);

        assert_eq!(
            record.get(NOTES_COLUMN).unwrap().as_text(),
            Some("Deal Size: LTM CAD; originally stored as CAD")
        );

        let entry = &audit.entries()[0];
        assert_eq!(entry.action, AuditAction::ValueScrubbed);
        assert_eq!(entry.old_value.as_deref(), Some("1,200 LTM CAD"));
        assert_eq!(entry.migrated_to.as_deref(), Some(LTM_EBITDA_COLUMN));
    }

    #[test]
    fn ttm_marker_targets_revenue() {
        let registry = financial_schema();
        let scrubber = FinancialScrubber::new(0.73);
        let mut audit = AuditLog::new(Uuid::new_v4());
        let mut records = vec![record_with(
            "Revenue",
            CellValue::Text("54.2 TTM".to_string()),
        )];

        scrubber.scrub_table("deals", registry.table("deals"), &mut records, &mut audit);

        let record = &records[0];
        assert_eq!(
            record.get(LTM_REVENUE_COLUMN).unwrap().as_number(),
            Some(54.2)
        );
        assert_eq!(record.get("Revenue").unwrap().as_number(), Some(54.2));
    }

    #[test]
    fn plain_numbers_stay_in_usd_untouched() {
        let registry = financial_schema();
        let scrubber = FinancialScrubber::new(0.73);
        let mut audit = AuditLog::new(Uuid::new_v4());
        let mut records = vec![record_with("Deal Size", CellValue::Number(500.0))];

        scrubber.scrub_table("deals", registry.table("deals"), &mut records, &mut audit);

        let record = &records[0];
        assert_eq!(record.get("Deal Size").unwrap().as_number(), Some(500.0));
        assert!(record.get(NOTES_COLUMN).unwrap().is_absent());
        // Still audited: the cell went through the scrub
        assert_eq!(audit.len(), 1);
    }

    #[test]
    fn notes_accumulate_with_semicolons() {
        let registry = financial_schema();
        let scrubber = FinancialScrubber::new(0.73);
        let mut audit = AuditLog::new(Uuid::new_v4());
        let mut record = TypedRecord::new();
        record.insert(NOTES_COLUMN, CellValue::Text("call back Monday".to_string()));
        record.insert("Deal Size", CellValue::Text("100 approx".to_string()));
        let mut records = vec![record];

        scrubber.scrub_table("deals", registry.table("deals"), &mut records, &mut audit);

        assert_eq!(
            records[0].get(NOTES_COLUMN).unwrap().as_text(),
            Some("call back Monday; Deal Size: approx")
        );
    }

    #[test]
    fn absent_cells_are_skipped() {
        let registry = financial_schema();
        let scrubber = FinancialScrubber::new(0.73);
        let mut audit = AuditLog::new(Uuid::new_v4());
        let mut records = vec![record_with("Deal Size", CellValue::Absent)];

        scrubber.scrub_table("deals", registry.table("deals"), &mut records, &mut audit);

        assert!(audit.is_empty());
        assert!(records[0].get("Deal Size").unwrap().is_absent());
    }

    #[test]
    fn unparsable_money_text_moves_entirely_to_notes() {
        let registry = financial_schema();
        let scrubber = FinancialScrubber::new(0.73);
        let mut audit = AuditLog::new(Uuid::new_v4());
        let mut records = vec![record_with(
            "Deal Size",
            CellValue::Text("pending diligence".to_string()),
        )];

        scrubber.scrub_table("deals", registry.table("deals"), &mut records, &mut audit);

        let record = &records[0];
        assert!(record.get("Deal Size").unwrap().is_absent());
        assert_eq!(
            record.get(NOTES_COLUMN).unwrap().as_text(),
            Some("Deal Size: pending diligence")
        );
    }
}

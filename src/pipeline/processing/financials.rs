//! Historical metric splitter: wide year-keyed deal columns become long
//! `FinancialMetric` rows.
//!
//! Deal sheets carry columns like `EBITDA 2020`, `EBITDA 2021`, one per
//! year. Those columns are stripped off the deal record and re-emitted as
//! one row per (deal, period, metric) with a value, leaving the deal table
//! narrow and the history queryable.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::common::constants::DEALS_TABLE;
use crate::domain::{CellValue, DealId, FinancialMetric, TypedRecord};
use crate::error::{PipelineError, Result};
use crate::observability::metrics::split as split_metrics;
use crate::pipeline::processing::audit::{AuditAction, AuditEntry, AuditLog};
use crate::pipeline::processing::normalize::cleaning;

/// `EBITDA 2020`, `Revenue_2021`, `EBITDA-2019`: a metric name, one
/// separator, and a 4-digit year between 1900 and 2099.
static METRIC_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)[ _-]((?:19|20)\d{2})$").unwrap());

pub struct MetricSplitter {
    strict: bool,
}

impl MetricSplitter {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Split one deal record in place, returning its metric rows. Absent
    /// year cells produce no row. Running again on the stripped record is
    /// a no-op.
    pub fn split_deal(
        &self,
        deal_id: DealId,
        row: usize,
        record: &mut TypedRecord,
        audit: &mut AuditLog,
    ) -> Result<Vec<FinancialMetric>> {
        let mut matched: Vec<(String, String, i32)> = Vec::new();
        for column in record.column_names() {
            if let Some(caps) = METRIC_YEAR.captures(column) {
                let metric = caps[1].trim().to_string();
                let Ok(period) = caps[2].parse::<i32>() else {
                    continue;
                };
                matched.push((column.to_string(), metric, period));
            }
        }

        let mut rows = Vec::new();
        for (column, metric, period) in matched {
            let Some(cell) = record.remove(&column) else {
                continue;
            };
            let value = match cell {
                CellValue::Number(n) => Some(n),
                CellValue::Absent => {
                    split_metrics::absent_cell_skipped();
                    continue;
                }
                CellValue::Text(ref s) => match cleaning::clean_numeric(s) {
                    Some(n) => Some(n),
                    None => {
                        self.unsplittable(deal_id, row, &column, &cell.to_string(), audit)?;
                        continue;
                    }
                },
                other => {
                    self.unsplittable(deal_id, row, &column, &other.to_string(), audit)?;
                    continue;
                }
            };
            rows.push(FinancialMetric {
                deal_id,
                period,
                metric: metric.clone(),
                value,
            });
        }

        split_metrics::metric_rows(rows.len() as u64);
        Ok(rows)
    }

    /// Split a whole batch of minted deal records.
    pub fn split_all(
        &self,
        deals: &mut [(DealId, TypedRecord)],
        audit: &mut AuditLog,
    ) -> Result<Vec<FinancialMetric>> {
        let mut all_rows = Vec::new();
        for (row, (deal_id, record)) in deals.iter_mut().enumerate() {
            all_rows.extend(self.split_deal(*deal_id, row, record, audit)?);
        }
        info!(
            "📊 Split {} historical metric row(s) from {} deal record(s)",
            all_rows.len(),
            deals.len()
        );
        Ok(all_rows)
    }

    fn unsplittable(
        &self,
        deal_id: DealId,
        row: usize,
        column: &str,
        raw: &str,
        audit: &mut AuditLog,
    ) -> Result<()> {
        if self.strict {
            return Err(PipelineError::TypeCoercion {
                table: DEALS_TABLE.to_string(),
                column: column.to_string(),
                row,
                value: raw.to_string(),
                expected: "number".to_string(),
            });
        }
        audit.record(
            AuditEntry::new(AuditAction::CoercionFallback, DEALS_TABLE, row)
                .with_column(column)
                .with_change(raw, "")
                .with_note(&format!("metric column for deal {} dropped", deal_id)),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn splitter() -> MetricSplitter {
        MetricSplitter::new(false)
    }

    fn audit() -> AuditLog {
        AuditLog::new(Uuid::new_v4())
    }

    #[test]
    fn sparse_years_produce_sparse_rows() {
        let mut record = TypedRecord::new();
        record.insert("Deal Name", CellValue::Text("Acme".into()));
        record.insert("EBITDA_2020", CellValue::Number(100.0));
        record.insert("EBITDA_2021", CellValue::Absent);
        let mut log = audit();

        let rows = splitter()
            .split_deal(DealId(1), 0, &mut record, &mut log)
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].period, 2020);
        assert_eq!(rows[0].metric, "EBITDA");
        assert_eq!(rows[0].value, Some(100.0));
        assert!(!rows.iter().any(|r| r.period == 2021));
    }

    #[test]
    fn separator_variants_all_match() {
        let mut record = TypedRecord::new();
        record.insert("Revenue 2019", CellValue::Number(1.0));
        record.insert("Revenue_2020", CellValue::Number(2.0));
        record.insert("Revenue-2021", CellValue::Number(3.0));
        record.insert("EBITDA margin 2021", CellValue::Number(0.4));
        let mut log = audit();

        let rows = splitter()
            .split_deal(DealId(5), 0, &mut record, &mut log)
            .unwrap();

        assert_eq!(rows.len(), 4);
        assert!(rows
            .iter()
            .any(|r| r.metric == "EBITDA margin" && r.period == 2021));
        assert_eq!(record.len(), 0);
    }

    #[test]
    fn unmatched_columns_stay_on_the_deal() {
        let mut record = TypedRecord::new();
        record.insert("Deal 2020 Notes", CellValue::Text("mid-year".into()));
        record.insert("EBITDA 2150", CellValue::Number(9.0));
        record.insert("EBITDA2020", CellValue::Number(8.0));
        let mut log = audit();

        let rows = splitter()
            .split_deal(DealId(2), 0, &mut record, &mut log)
            .unwrap();

        assert!(rows.is_empty());
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut record = TypedRecord::new();
        record.insert("EBITDA 2020", CellValue::Number(100.0));
        let mut log = audit();
        let splitter = splitter();

        let first = splitter
            .split_deal(DealId(3), 0, &mut record, &mut log)
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = splitter
            .split_deal(DealId(3), 0, &mut record, &mut log)
            .unwrap();
        assert!(second.is_empty());
        assert!(!record.contains("EBITDA 2020"));
    }

    #[test]
    fn text_cells_under_metric_columns_parse_numerically() {
        let mut record = TypedRecord::new();
        record.insert("EBITDA 2020", CellValue::Text("1,200".into()));
        let mut log = audit();

        let rows = splitter()
            .split_deal(DealId(4), 0, &mut record, &mut log)
            .unwrap();
        assert_eq!(rows[0].value, Some(1200.0));
    }

    #[test]
    fn lenient_mode_drops_garbage_with_audit() {
        let mut record = TypedRecord::new();
        record.insert("EBITDA 2020", CellValue::Text("tbd".into()));
        let mut log = audit();

        let rows = splitter()
            .split_deal(DealId(6), 1, &mut record, &mut log)
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(log.count_of(AuditAction::CoercionFallback), 1);
    }

    #[test]
    fn strict_mode_rejects_garbage() {
        let mut record = TypedRecord::new();
        record.insert("EBITDA 2020", CellValue::Text("tbd".into()));
        let mut log = audit();

        let err = MetricSplitter::new(true)
            .split_deal(DealId(6), 1, &mut record, &mut log)
            .unwrap_err();
        assert!(err.to_string().contains("EBITDA 2020"));
    }
}

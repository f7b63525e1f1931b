//! Snapshot reader: one directory of per-table JSON exports in, stamped
//! raw batches out. The upstream Excel-to-JSON conversion happens outside
//! this crate; we pick up whichever table files the export produced.

use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::envelope::BatchEnvelope;
use crate::common::constants::{
    COMPANIES_TABLE, CONTACTS_TABLE, DEALS_TABLE, PARTICIPANTS_TABLE,
};
use crate::error::{PipelineError, Result};
use crate::observability::metrics::ingestion as ingestion_metrics;

/// One raw spreadsheet row: column name to untyped cell, in sheet order.
pub type RawRecord = serde_json::Map<String, Value>;

#[derive(Debug, Clone)]
pub struct RawBatch {
    pub table: String,
    pub envelope: BatchEnvelope,
    pub records: Vec<RawRecord>,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub batches: Vec<RawBatch>,
}

impl Snapshot {
    /// Load every recognized table file present in the snapshot directory.
    /// Missing tables are fine; a directory with none of them is an error.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(PipelineError::Snapshot(format!(
                "snapshot directory does not exist: {}",
                dir.display()
            )));
        }

        let mut batches = Vec::new();
        for table in [
            DEALS_TABLE,
            COMPANIES_TABLE,
            CONTACTS_TABLE,
            PARTICIPANTS_TABLE,
        ] {
            let path = dir.join(format!("{}.json", table));
            if !path.exists() {
                continue;
            }
            match load_table_file(table, &path) {
                Ok(batch) => {
                    info!(
                        "📥 Loaded {} record(s) from {} (batch {})",
                        batch.records.len(),
                        path.display(),
                        batch.envelope.batch_id
                    );
                    ingestion_metrics::records_read(batch.records.len() as u64);
                    batches.push(batch);
                }
                Err(e) => {
                    warn!("Failed to load {}: {}", path.display(), e);
                    ingestion_metrics::error();
                    return Err(e);
                }
            }
        }

        if batches.is_empty() {
            return Err(PipelineError::Snapshot(format!(
                "no snapshot tables found in {} (expected {}.json and friends)",
                dir.display(),
                DEALS_TABLE
            )));
        }

        ingestion_metrics::snapshot_loaded();
        Ok(Self { batches })
    }

    pub fn batch(&self, table: &str) -> Option<&RawBatch> {
        self.batches.iter().find(|b| b.table == table)
    }

    pub fn total_records(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }
}

fn load_table_file(table: &str, path: &Path) -> Result<RawBatch> {
    let bytes = fs::read(path)?;
    ingestion_metrics::bytes_read(bytes.len());

    let parsed: Value = serde_json::from_slice(&bytes)?;
    let rows = match parsed {
        Value::Array(rows) => rows,
        other => {
            return Err(PipelineError::Snapshot(format!(
                "{}: expected a JSON array of row objects, got {}",
                path.display(),
                json_type_name(&other)
            )))
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        match row {
            Value::Object(map) => records.push(map),
            other => {
                return Err(PipelineError::Snapshot(format!(
                    "{} row {}: expected a JSON object, got {}",
                    path.display(),
                    index,
                    json_type_name(&other)
                )))
            }
        }
    }

    let envelope = BatchEnvelope::stamp(table, path, &bytes, records.len());
    Ok(RawBatch {
        table: table.to_string(),
        envelope,
        records,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Metrics for the deal intake pipeline.
//!
//! Thin wrappers over the `metrics` facade using Prometheus naming
//! conventions. The embedding process may install any recorder it likes;
//! without one the calls are no-ops, which keeps the pipeline usable as
//! a plain library.

use std::fmt;

/// Enum representing all metric names used in the system.
/// This eliminates magic strings and provides compile-time safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingestion metrics
    IngestionSnapshotsLoaded,
    IngestionRecordsRead,
    IngestionBytesRead,
    IngestionErrors,

    // Normalize metrics
    NormalizeRecordsProcessed,
    NormalizeCellsCoerced,
    NormalizeNullsUnified,
    NormalizeCoercionFailures,
    NormalizeBatchSize,

    // Financial scrub metrics
    FinancialsCurrencyConversions,
    FinancialsNotesRelocated,
    FinancialsAuditEntries,

    // Metric split metrics
    SplitMetricRows,
    SplitAbsentCellsSkipped,

    // Identity minting metrics
    MintIdsAssigned,
    MintDuplicatesCollapsed,

    // Reconciliation metrics
    ReconcileMatchedEmail,
    ReconcileMatchedName,
    ReconcileCreated,
    ReconcileAmbiguous,

    // Assembly metrics
    AssembleRowsEmitted,
    AssembleViolations,
}

impl MetricName {
    /// Get the metric name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            // Ingestion metrics
            MetricName::IngestionSnapshotsLoaded => "dealbook_ingestion_snapshots_loaded_total",
            MetricName::IngestionRecordsRead => "dealbook_ingestion_records_read_total",
            MetricName::IngestionBytesRead => "dealbook_ingestion_bytes_read",
            MetricName::IngestionErrors => "dealbook_ingestion_errors_total",

            // Normalize metrics
            MetricName::NormalizeRecordsProcessed => "dealbook_normalize_records_processed_total",
            MetricName::NormalizeCellsCoerced => "dealbook_normalize_cells_coerced_total",
            MetricName::NormalizeNullsUnified => "dealbook_normalize_nulls_unified_total",
            MetricName::NormalizeCoercionFailures => "dealbook_normalize_coercion_failures_total",
            MetricName::NormalizeBatchSize => "dealbook_normalize_batch_size",

            // Financial scrub metrics
            MetricName::FinancialsCurrencyConversions => {
                "dealbook_financials_currency_conversions_total"
            }
            MetricName::FinancialsNotesRelocated => "dealbook_financials_notes_relocated_total",
            MetricName::FinancialsAuditEntries => "dealbook_financials_audit_entries_total",

            // Metric split metrics
            MetricName::SplitMetricRows => "dealbook_split_metric_rows_total",
            MetricName::SplitAbsentCellsSkipped => "dealbook_split_absent_cells_skipped_total",

            // Identity minting metrics
            MetricName::MintIdsAssigned => "dealbook_mint_ids_assigned_total",
            MetricName::MintDuplicatesCollapsed => "dealbook_mint_duplicates_collapsed_total",

            // Reconciliation metrics
            MetricName::ReconcileMatchedEmail => "dealbook_reconcile_matched_email_total",
            MetricName::ReconcileMatchedName => "dealbook_reconcile_matched_name_total",
            MetricName::ReconcileCreated => "dealbook_reconcile_created_total",
            MetricName::ReconcileAmbiguous => "dealbook_reconcile_ambiguous_total",

            // Assembly metrics
            MetricName::AssembleRowsEmitted => "dealbook_assemble_rows_emitted_total",
            MetricName::AssembleViolations => "dealbook_assemble_violations_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Register descriptions for every metric so an installed recorder can
/// surface help text. Safe to call when no recorder is installed.
pub fn init() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        MetricName::IngestionSnapshotsLoaded.as_str(),
        "Snapshot directories loaded"
    );
    describe_counter!(
        MetricName::IngestionRecordsRead.as_str(),
        "Raw records read across all tables"
    );
    describe_histogram!(
        MetricName::IngestionBytesRead.as_str(),
        "Bytes read per snapshot file"
    );
    describe_counter!(
        MetricName::IngestionErrors.as_str(),
        "Snapshot files that failed to load"
    );

    describe_counter!(
        MetricName::NormalizeRecordsProcessed.as_str(),
        "Records run through field normalization"
    );
    describe_counter!(
        MetricName::NormalizeCellsCoerced.as_str(),
        "Cells coerced to a declared type"
    );
    describe_counter!(
        MetricName::NormalizeNullsUnified.as_str(),
        "Null spellings collapsed to absent"
    );
    describe_counter!(
        MetricName::NormalizeCoercionFailures.as_str(),
        "Cells that could not be coerced"
    );
    describe_histogram!(
        MetricName::NormalizeBatchSize.as_str(),
        "Records per normalized table"
    );

    describe_counter!(
        MetricName::FinancialsCurrencyConversions.as_str(),
        "CAD values converted to USD"
    );
    describe_counter!(
        MetricName::FinancialsNotesRelocated.as_str(),
        "Narrative fragments moved into the notes column"
    );
    describe_counter!(
        MetricName::FinancialsAuditEntries.as_str(),
        "Audit log entries written by the financial scrub"
    );

    describe_counter!(
        MetricName::SplitMetricRows.as_str(),
        "Long-form metric rows produced by the splitter"
    );
    describe_counter!(
        MetricName::SplitAbsentCellsSkipped.as_str(),
        "Absent metric cells skipped by the splitter"
    );

    describe_counter!(
        MetricName::MintIdsAssigned.as_str(),
        "Surrogate identifiers assigned"
    );
    describe_counter!(
        MetricName::MintDuplicatesCollapsed.as_str(),
        "Duplicate natural keys collapsed before minting"
    );

    describe_counter!(
        MetricName::ReconcileMatchedEmail.as_str(),
        "Participants matched to a contact by email"
    );
    describe_counter!(
        MetricName::ReconcileMatchedName.as_str(),
        "Participants matched to a contact by name fallback"
    );
    describe_counter!(
        MetricName::ReconcileCreated.as_str(),
        "Contacts created from unmatched participants"
    );
    describe_counter!(
        MetricName::ReconcileAmbiguous.as_str(),
        "Participants left unmatched due to ambiguity"
    );

    describe_counter!(
        MetricName::AssembleRowsEmitted.as_str(),
        "Rows emitted into final tables"
    );
    describe_counter!(
        MetricName::AssembleViolations.as_str(),
        "Referential integrity violations detected"
    );
}

// ============================================================================
// Ingestion Metrics
// ============================================================================

pub mod ingestion {
    use super::MetricName;

    pub fn snapshot_loaded() {
        ::metrics::counter!(MetricName::IngestionSnapshotsLoaded.as_str()).increment(1);
    }

    pub fn records_read(count: u64) {
        ::metrics::counter!(MetricName::IngestionRecordsRead.as_str()).increment(count);
    }

    pub fn bytes_read(bytes: usize) {
        ::metrics::histogram!(MetricName::IngestionBytesRead.as_str()).record(bytes as f64);
    }

    pub fn error() {
        ::metrics::counter!(MetricName::IngestionErrors.as_str()).increment(1);
    }
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    pub fn records_processed(count: u64) {
        ::metrics::counter!(MetricName::NormalizeRecordsProcessed.as_str()).increment(count);
    }

    pub fn cell_coerced() {
        ::metrics::counter!(MetricName::NormalizeCellsCoerced.as_str()).increment(1);
    }

    pub fn null_unified() {
        ::metrics::counter!(MetricName::NormalizeNullsUnified.as_str()).increment(1);
    }

    pub fn coercion_failure() {
        ::metrics::counter!(MetricName::NormalizeCoercionFailures.as_str()).increment(1);
    }

    pub fn batch_size(size: usize) {
        ::metrics::histogram!(MetricName::NormalizeBatchSize.as_str()).record(size as f64);
    }
}

// ============================================================================
// Financial Scrub Metrics
// ============================================================================

pub mod financials {
    use super::MetricName;

    pub fn currency_converted() {
        ::metrics::counter!(MetricName::FinancialsCurrencyConversions.as_str()).increment(1);
    }

    pub fn notes_relocated() {
        ::metrics::counter!(MetricName::FinancialsNotesRelocated.as_str()).increment(1);
    }

    pub fn audit_entry() {
        ::metrics::counter!(MetricName::FinancialsAuditEntries.as_str()).increment(1);
    }
}

// ============================================================================
// Metric Split Metrics
// ============================================================================

pub mod split {
    use super::MetricName;

    pub fn metric_rows(count: u64) {
        ::metrics::counter!(MetricName::SplitMetricRows.as_str()).increment(count);
    }

    pub fn absent_cell_skipped() {
        ::metrics::counter!(MetricName::SplitAbsentCellsSkipped.as_str()).increment(1);
    }
}

// ============================================================================
// Identity Minting Metrics
// ============================================================================

pub mod mint {
    use super::MetricName;

    pub fn ids_assigned(count: u64) {
        ::metrics::counter!(MetricName::MintIdsAssigned.as_str()).increment(count);
    }

    pub fn duplicate_collapsed() {
        ::metrics::counter!(MetricName::MintDuplicatesCollapsed.as_str()).increment(1);
    }
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

pub mod reconcile {
    use super::MetricName;

    pub fn matched_email() {
        ::metrics::counter!(MetricName::ReconcileMatchedEmail.as_str()).increment(1);
    }

    pub fn matched_name() {
        ::metrics::counter!(MetricName::ReconcileMatchedName.as_str()).increment(1);
    }

    pub fn created() {
        ::metrics::counter!(MetricName::ReconcileCreated.as_str()).increment(1);
    }

    pub fn ambiguous() {
        ::metrics::counter!(MetricName::ReconcileAmbiguous.as_str()).increment(1);
    }
}

// ============================================================================
// Assembly Metrics
// ============================================================================

pub mod assemble {
    use super::MetricName;

    pub fn rows_emitted(count: u64) {
        ::metrics::counter!(MetricName::AssembleRowsEmitted.as_str()).increment(count);
    }

    pub fn violation() {
        ::metrics::counter!(MetricName::AssembleViolations.as_str()).increment(1);
    }
}

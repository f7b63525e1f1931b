//! Runs one snapshot through every stage in order.
//!
//! Normalization is per-row and could fan out, but identity assignment
//! and reconciliation mutate run-scoped counters and indices, so the
//! whole run executes as one sequential pass. A run either produces a
//! complete set of tables or fails with the full defect list.

use tracing::info;
use uuid::Uuid;

use crate::common::constants::{
    COMPANIES_TABLE, CONTACTS_TABLE, DEALS_TABLE, PARTICIPANTS_TABLE,
};
use crate::domain::{CellValue, Deal, DealId, TypedRecord};
use crate::error::{PipelineError, Result};
use crate::pipeline::ingestion::Snapshot;
use crate::pipeline::processing::assemble::{assemble, AssembledTables};
use crate::pipeline::processing::audit::AuditLog;
use crate::pipeline::processing::companies::CompanyLedger;
use crate::pipeline::processing::financials::MetricSplitter;
use crate::pipeline::processing::mint::IdMinter;
use crate::pipeline::processing::normalize::scrub::FinancialScrubber;
use crate::pipeline::processing::normalize::FieldNormalizer;
use crate::pipeline::processing::reconcile::{ContactMaster, Reconciler};
use crate::registry::{RunMode, SchemaRegistry};

/// Everything one run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub tables: AssembledTables,
    pub audit: AuditLog,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub records_in: usize,
    pub rows_out: usize,
    pub audit_entries: usize,
}

pub struct PipelineRunner {
    registry: SchemaRegistry,
}

impl PipelineRunner {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Process the snapshot to completion.
    pub fn run(&self, snapshot: &Snapshot) -> Result<PipelineOutput> {
        let run_id = Uuid::new_v4();
        let run_config = self.registry.run_config();
        let strict = run_config.mode == RunMode::Strict;
        info!(
            "🔄 Pipeline run {} starting: {} raw record(s), {:?} mode",
            run_id,
            snapshot.total_records(),
            run_config.mode
        );

        let mut audit = AuditLog::new(run_id);
        let mut minter = IdMinter::new(&self.registry.ids);
        let normalizer = FieldNormalizer::new(&self.registry);

        let mut deal_records = self.normalize_table(&normalizer, snapshot, DEALS_TABLE, &mut audit)?;
        let company_records =
            self.normalize_table(&normalizer, snapshot, COMPANIES_TABLE, &mut audit)?;
        let contact_records =
            self.normalize_table(&normalizer, snapshot, CONTACTS_TABLE, &mut audit)?;
        let participant_records =
            self.normalize_table(&normalizer, snapshot, PARTICIPANTS_TABLE, &mut audit)?;

        let scrubber = FinancialScrubber::new(run_config.cad_to_usd);
        scrubber.scrub_table(
            DEALS_TABLE,
            self.registry.table(DEALS_TABLE),
            &mut deal_records,
            &mut audit,
        );

        let mut ledger = CompanyLedger::build(
            &company_records,
            self.registry.table(COMPANIES_TABLE),
            &mut minter,
            &mut audit,
        )?;
        let master = ContactMaster::build(
            &contact_records,
            self.registry.table(CONTACTS_TABLE),
            &mut minter,
            &mut audit,
        )?;

        let mut minted_deals: Vec<(DealId, TypedRecord)> = Vec::with_capacity(deal_records.len());
        for record in deal_records {
            minted_deals.push((minter.next_deal()?, record));
        }
        let splitter = MetricSplitter::new(strict);
        let financial_metrics = splitter.split_all(&mut minted_deals, &mut audit)?;
        let deals = self.link_deals(minted_deals, &mut ledger, &mut minter, &mut audit)?;

        let mut reconciler = Reconciler::new(master, self.registry.reconcile.clone());
        let participants = reconciler.reconcile(
            &participant_records,
            self.registry.table(PARTICIPANTS_TABLE),
            &mut minter,
            &mut audit,
        )?;

        let tables = assemble(
            deals,
            financial_metrics,
            ledger.into_companies(),
            reconciler.into_contacts(),
            participants,
        )?;

        let summary = RunSummary {
            run_id,
            mode: run_config.mode,
            records_in: snapshot.total_records(),
            rows_out: tables.total_rows(),
            audit_entries: audit.len(),
        };
        info!(
            "✅ Pipeline run {} complete: {} record(s) in, {} row(s) out, {} audit entr(ies)",
            run_id, summary.records_in, summary.rows_out, summary.audit_entries
        );
        Ok(PipelineOutput {
            tables,
            audit,
            summary,
        })
    }

    fn normalize_table(
        &self,
        normalizer: &FieldNormalizer<'_>,
        snapshot: &Snapshot,
        table: &str,
        audit: &mut AuditLog,
    ) -> Result<Vec<TypedRecord>> {
        match snapshot.batch(table) {
            Some(batch) => normalizer.normalize_batch(batch, audit),
            None => Ok(Vec::new()),
        }
    }

    /// Turn minted deal records into Deal rows, resolving each company
    /// reference through the ledger.
    fn link_deals(
        &self,
        minted: Vec<(DealId, TypedRecord)>,
        ledger: &mut CompanyLedger,
        minter: &mut IdMinter,
        audit: &mut AuditLog,
    ) -> Result<Vec<Deal>> {
        let schema = self.registry.table(DEALS_TABLE);
        let name_column = schema.and_then(|s| s.name_column.as_deref());
        let company_column = schema.and_then(|s| s.company_column.as_deref());
        if company_column.is_none() && !minted.is_empty() {
            return Err(PipelineError::Registry(format!(
                "table '{}' has rows but no company_column binding to resolve companies through",
                DEALS_TABLE
            )));
        }

        let mut deals = Vec::with_capacity(minted.len());
        for (row, (deal_id, record)) in minted.into_iter().enumerate() {
            let company_id = match company_column
                .and_then(|c| record.get(c))
                .and_then(CellValue::as_text)
            {
                Some(name) => Some(ledger.resolve_or_create(name, row, minter, audit)?),
                None => None,
            };
            deals.push(Deal {
                deal_id,
                name: name_column
                    .and_then(|c| record.get(c))
                    .and_then(CellValue::as_text)
                    .map(str::to_string),
                company_id,
                attributes: record,
            });
        }
        Ok(deals)
    }
}

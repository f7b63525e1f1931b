//! Company identity: one ID per real-world company.
//!
//! The companies batch seeds the ledger in row order; deal rows then
//! resolve their company reference through it, minting a target company
//! on the fly when a deal names one the batch never mentioned. Dedup is
//! by normalized name, so `" ACME  Capital"` and `"Acme Capital"` are the
//! same company.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::common::constants::{COMPANIES_TABLE, DEALS_TABLE};
use crate::domain::{CellValue, Company, CompanyId, CompanyKind, TypedRecord};
use crate::error::{PipelineError, Result};
use crate::observability::metrics::mint as mint_metrics;
use crate::pipeline::processing::audit::{AuditAction, AuditEntry, AuditLog};
use crate::pipeline::processing::mint::IdMinter;
use crate::pipeline::processing::normalize::cleaning;
use crate::registry::TableSchema;

/// Case- and whitespace-insensitive identity key for a company name.
pub fn company_key(name: &str) -> String {
    cleaning::clean_text(name).to_lowercase()
}

/// The loose vocabulary the type column actually contains.
fn parse_company_kind(text: Option<&str>) -> CompanyKind {
    let Some(text) = text else {
        return CompanyKind::Target;
    };
    match cleaning::clean_text(text).to_lowercase().as_str() {
        "pe" | "pe firm" | "sponsor" | "private equity" | "private equity firm" => {
            CompanyKind::PeFirm
        }
        _ => CompanyKind::Target,
    }
}

#[derive(Debug)]
pub struct CompanyLedger {
    companies: Vec<Company>,
    by_key: HashMap<String, CompanyId>,
}

impl CompanyLedger {
    /// Seed the ledger from the companies batch, in row order. The first
    /// row with a given normalized name wins the ID; later rows with the
    /// same name merge into it, backfilling absent fields only.
    pub fn build(
        records: &[TypedRecord],
        schema: Option<&TableSchema>,
        minter: &mut IdMinter,
        audit: &mut AuditLog,
    ) -> Result<Self> {
        let mut ledger = Self {
            companies: Vec::new(),
            by_key: HashMap::new(),
        };
        if records.is_empty() {
            return Ok(ledger);
        }

        let Some(name_column) = schema.and_then(|s| s.name_column.as_deref()) else {
            return Err(PipelineError::Registry(format!(
                "table '{}' has rows but no name_column binding to dedup on",
                COMPANIES_TABLE
            )));
        };
        let kind_column = schema.and_then(|s| s.kind_column.as_deref());

        for (row, record) in records.iter().enumerate() {
            let name = record.get(name_column).and_then(CellValue::as_text);
            let Some(name) = name else {
                warn!(
                    "Skipping {} row {}: no usable value in '{}'",
                    COMPANIES_TABLE, row, name_column
                );
                continue;
            };

            let key = company_key(name);
            if let Some(existing_id) = ledger.by_key.get(&key).copied() {
                ledger.merge_into(existing_id, record);
                mint_metrics::duplicate_collapsed();
                audit.record(
                    AuditEntry::new(AuditAction::DuplicateMerged, COMPANIES_TABLE, row)
                        .with_column(name_column)
                        .with_note(&format!("merged into company {}", existing_id)),
                );
                debug!("Merged duplicate company '{}' into {}", name, existing_id);
                continue;
            }

            let company_id = minter.next_company()?;
            let kind = parse_company_kind(
                kind_column
                    .and_then(|c| record.get(c))
                    .and_then(CellValue::as_text),
            );
            ledger.by_key.insert(key.clone(), company_id);
            ledger.companies.push(Company {
                company_id,
                name: cleaning::clean_text(name),
                name_lower: key,
                kind,
                attributes: record.clone(),
            });
        }

        info!(
            "🏢 Company ledger holds {} compan(ies) from {} row(s)",
            ledger.companies.len(),
            records.len()
        );
        Ok(ledger)
    }

    /// Resolve a deal row's company by name, minting an unseen one as a
    /// target company so the deal's reference always lands somewhere.
    pub fn resolve_or_create(
        &mut self,
        name: &str,
        deal_row: usize,
        minter: &mut IdMinter,
        audit: &mut AuditLog,
    ) -> Result<CompanyId> {
        let key = company_key(name);
        if let Some(existing_id) = self.by_key.get(&key).copied() {
            debug!("Deal row {} uses existing company {}", deal_row, existing_id);
            return Ok(existing_id);
        }

        let company_id = minter.next_company()?;
        let display_name = cleaning::clean_text(name);
        info!("Created company '{}' ({}) from deal row", display_name, company_id);
        audit.record(
            AuditEntry::new(AuditAction::CompanyCreated, DEALS_TABLE, deal_row)
                .with_note(&format!("company '{}' minted as {}", display_name, company_id)),
        );
        self.by_key.insert(key.clone(), company_id);
        self.companies.push(Company {
            company_id,
            name: display_name,
            name_lower: key,
            kind: CompanyKind::Target,
            attributes: TypedRecord::new(),
        });
        Ok(company_id)
    }

    pub fn get(&self, name: &str) -> Option<CompanyId> {
        self.by_key.get(&company_key(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    pub fn into_companies(self) -> Vec<Company> {
        self.companies
    }

    fn merge_into(&mut self, company_id: CompanyId, record: &TypedRecord) {
        let Some(company) = self
            .companies
            .iter_mut()
            .find(|c| c.company_id == company_id)
        else {
            return;
        };
        for (column, value) in record.iter() {
            if value.is_absent() {
                continue;
            }
            let missing = company
                .attributes
                .get(column)
                .map(CellValue::is_absent)
                .unwrap_or(true);
            if missing {
                company.attributes.insert(column.to_string(), value.clone());
            }
        }
    }
}

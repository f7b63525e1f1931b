//! Final table assembly with referential integrity enforcement.
//!
//! Everything upstream has already made its decisions; this pass only
//! verifies them. Checks are exhaustive: one failed run reports every
//! broken key it can find, not just the first.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{error, info};

use crate::common::constants::{
    COMPANIES_TABLE, CONTACTS_TABLE, DEALS_TABLE, PARTICIPANTS_TABLE,
};
use crate::domain::{Company, Contact, Deal, FinancialMetric, MarketingParticipant};
use crate::error::{PipelineError, Result};
use crate::observability::metrics::assemble as assemble_metrics;
use crate::pipeline::processing::audit::IntegrityViolation;

/// The five output tables of one pipeline run.
#[derive(Debug, Serialize)]
pub struct AssembledTables {
    pub deals: Vec<Deal>,
    pub financial_metrics: Vec<FinancialMetric>,
    pub companies: Vec<Company>,
    pub contacts: Vec<Contact>,
    pub participants: Vec<MarketingParticipant>,
}

impl AssembledTables {
    pub fn total_rows(&self) -> usize {
        self.deals.len()
            + self.financial_metrics.len()
            + self.companies.len()
            + self.contacts.len()
            + self.participants.len()
    }
}

/// Assemble the output tables, failing with the full violation list if
/// any primary key repeats or any foreign key dangles.
pub fn assemble(
    deals: Vec<Deal>,
    financial_metrics: Vec<FinancialMetric>,
    companies: Vec<Company>,
    contacts: Vec<Contact>,
    participants: Vec<MarketingParticipant>,
) -> Result<AssembledTables> {
    let mut violations = Vec::new();

    let mut deal_ids = HashSet::new();
    for deal in &deals {
        if !deal_ids.insert(deal.deal_id) {
            violations.push(IntegrityViolation::DuplicatePrimaryKey {
                table: DEALS_TABLE.to_string(),
                id: deal.deal_id.0,
            });
        }
    }
    let mut company_ids = HashSet::new();
    for company in &companies {
        if !company_ids.insert(company.company_id) {
            violations.push(IntegrityViolation::DuplicatePrimaryKey {
                table: COMPANIES_TABLE.to_string(),
                id: company.company_id.0,
            });
        }
    }
    let mut contact_ids = HashSet::new();
    for contact in &contacts {
        if !contact_ids.insert(contact.contact_id) {
            violations.push(IntegrityViolation::DuplicatePrimaryKey {
                table: CONTACTS_TABLE.to_string(),
                id: contact.contact_id.0,
            });
        }
    }
    let mut participant_ids = HashSet::new();
    for participant in &participants {
        if !participant_ids.insert(participant.participant_id) {
            violations.push(IntegrityViolation::DuplicatePrimaryKey {
                table: PARTICIPANTS_TABLE.to_string(),
                id: participant.participant_id.0,
            });
        }
    }

    // The metric table's primary key is the whole triple
    let mut metric_keys = HashSet::new();
    for metric in &financial_metrics {
        if !metric_keys.insert((metric.deal_id, metric.period, metric.metric.clone())) {
            violations.push(IntegrityViolation::DuplicateMetric {
                deal_id: metric.deal_id,
                period: metric.period,
                metric: metric.metric.clone(),
            });
        }
    }

    for deal in &deals {
        match deal.company_id {
            None => violations.push(IntegrityViolation::UnresolvedCompany {
                deal_id: deal.deal_id,
            }),
            Some(company_id) if !company_ids.contains(&company_id) => {
                violations.push(IntegrityViolation::UnknownCompany {
                    deal_id: deal.deal_id,
                    company_id,
                });
            }
            Some(_) => {}
        }
    }
    for metric in &financial_metrics {
        if !deal_ids.contains(&metric.deal_id) {
            violations.push(IntegrityViolation::UnknownDeal {
                deal_id: metric.deal_id,
                period: metric.period,
                metric: metric.metric.clone(),
            });
        }
    }
    for participant in &participants {
        if !contact_ids.contains(&participant.contact_id) {
            violations.push(IntegrityViolation::UnknownContact {
                participant_id: participant.participant_id,
                contact_id: participant.contact_id,
            });
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            assemble_metrics::violation();
            error!("Integrity violation: {}", violation);
        }
        return Err(PipelineError::ReferentialIntegrity { violations });
    }

    let tables = AssembledTables {
        deals,
        financial_metrics,
        companies,
        contacts,
        participants,
    };
    assemble_metrics::rows_emitted(tables.total_rows() as u64);
    info!(
        "🏗️ Assembled {} deal(s), {} metric row(s), {} compan(ies), {} contact(s), {} participant(s)",
        tables.deals.len(),
        tables.financial_metrics.len(),
        tables.companies.len(),
        tables.contacts.len(),
        tables.participants.len()
    );
    Ok(tables)
}

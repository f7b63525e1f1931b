//! Run-scoped audit log.
//!
//! Every stage that changes a value or makes a resolution decision records
//! what it did here. The log is part of the pipeline's output: review of a
//! quarter's intake starts from these entries, not from diffing snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{CompanyId, ContactId, DealId, ParticipantId};

/// The kinds of changes and decisions a run can record.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Lenient mode turned an unparsable cell into absent
    CoercionFallback,
    /// The financial scrub rewrote, annotated, or relocated a value
    ValueScrubbed,
    /// Two source rows collapsed into one entity during a master build
    DuplicateMerged,
    /// A company was minted from a deal row's unseen company name
    CompanyCreated,
    /// Participant matched an existing contact by normalized email
    MatchedEmail,
    /// Participant matched an existing contact by the name fallback
    MatchedName,
    /// Participant matched nothing; a new contact was minted
    ContactCreated,
    /// Name fallback found several candidates; left unmatched
    AmbiguousName,
}

/// One recorded change. Mirrors the review sheet the deal team works from:
/// where it happened, what the value was, what it became, and why.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub table: String,
    pub row: usize,
    pub column: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub note: Option<String>,
    pub migrated_to: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, table: &str, row: usize) -> Self {
        Self {
            action,
            table: table.to_string(),
            row,
            column: None,
            old_value: None,
            new_value: None,
            note: None,
            migrated_to: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }

    pub fn with_change(mut self, old_value: &str, new_value: &str) -> Self {
        self.old_value = Some(old_value.to_string());
        self.new_value = Some(new_value.to_string());
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn with_migrated_to(mut self, column: &str) -> Self {
        self.migrated_to = Some(column.to_string());
        self
    }
}

/// Append-only log owned by one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_of(&self, action: AuditAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }
}

/// One normalized email claimed by more than one existing contact.
/// Reported when a supplied master registry fails the uniqueness check.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateEmailCluster {
    pub email: String,
    pub contact_ids: Vec<ContactId>,
}

impl std::fmt::Display for DuplicateEmailCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.contact_ids.iter().map(|id| id.to_string()).collect();
        write!(f, "{} -> contacts [{}]", self.email, ids.join(", "))
    }
}

/// A single referential-integrity failure found during table assembly.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IntegrityViolation {
    DuplicatePrimaryKey {
        table: String,
        id: u64,
    },
    /// A deal points at a company_id that is not in the companies table
    UnknownCompany {
        deal_id: DealId,
        company_id: CompanyId,
    },
    /// A deal carries no company reference at all
    UnresolvedCompany {
        deal_id: DealId,
    },
    /// A financial metric points at a deal that does not exist
    UnknownDeal {
        deal_id: DealId,
        period: i32,
        metric: String,
    },
    /// A participant points at a contact that does not exist
    UnknownContact {
        participant_id: ParticipantId,
        contact_id: ContactId,
    },
    /// Two metric rows share (deal, period, metric)
    DuplicateMetric {
        deal_id: DealId,
        period: i32,
        metric: String,
    },
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityViolation::DuplicatePrimaryKey { table, id } => {
                write!(f, "duplicate primary key {} in table '{}'", id, table)
            }
            IntegrityViolation::UnknownCompany {
                deal_id,
                company_id,
            } => write!(
                f,
                "deal {} references missing company {}",
                deal_id, company_id
            ),
            IntegrityViolation::UnresolvedCompany { deal_id } => {
                write!(f, "deal {} has no company reference", deal_id)
            }
            IntegrityViolation::UnknownDeal {
                deal_id,
                period,
                metric,
            } => write!(
                f,
                "metric '{}' ({}) references missing deal {}",
                metric, period, deal_id
            ),
            IntegrityViolation::UnknownContact {
                participant_id,
                contact_id,
            } => write!(
                f,
                "participant {} references missing contact {}",
                participant_id, contact_id
            ),
            IntegrityViolation::DuplicateMetric {
                deal_id,
                period,
                metric,
            } => write!(
                f,
                "duplicate metric row (deal {}, period {}, metric '{}')",
                deal_id, period, metric
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_counts_entries() {
        let mut log = AuditLog::new(Uuid::new_v4());
        assert!(log.is_empty());

        log.record(
            AuditEntry::new(AuditAction::ValueScrubbed, "deals", 3)
                .with_column("LTM EBITDA")
                .with_change("1,200 CAD", "876")
                .with_note("originally stored as CAD"),
        );
        log.record(AuditEntry::new(AuditAction::MatchedEmail, "participants", 0));
        log.record(AuditEntry::new(AuditAction::MatchedEmail, "participants", 1));

        assert_eq!(log.len(), 3);
        assert_eq!(log.count_of(AuditAction::MatchedEmail), 2);
        assert_eq!(log.count_of(AuditAction::ContactCreated), 0);

        let scrub = &log.entries()[0];
        assert_eq!(scrub.column.as_deref(), Some("LTM EBITDA"));
        assert_eq!(scrub.old_value.as_deref(), Some("1,200 CAD"));
        assert_eq!(scrub.new_value.as_deref(), Some("876"));
    }

    #[test]
    fn violations_render_for_operators() {
        let violation = IntegrityViolation::UnknownCompany {
            deal_id: DealId(7),
            company_id: CompanyId(42),
        };
        assert_eq!(
            violation.to_string(),
            "deal 7 references missing company 42"
        );

        let cluster = DuplicateEmailCluster {
            email: "jane@fund.com".to_string(),
            contact_ids: vec![ContactId(1), ContactId(9)],
        };
        assert_eq!(cluster.to_string(), "jane@fund.com -> contacts [1, 9]");
    }
}

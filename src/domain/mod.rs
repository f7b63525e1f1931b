use serde::Serialize;

pub mod value;

pub use value::{CellValue, TypedRecord};

/// The entity families that receive surrogate identifiers.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Deal,
    Company,
    Contact,
    Participant,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Deal => "deal",
            EntityKind::Company => "company",
            EntityKind::Contact => "contact",
            EntityKind::Participant => "participant",
        };
        write!(f, "{}", name)
    }
}

/// Surrogate keys. Sequential within a run, unique per table, immutable
/// once assigned. Serialized as plain numbers for database loading.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DealId(pub u64);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompanyId(pub u64);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub u64);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub u64);

impl std::fmt::Display for DealId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompanyKind {
    PeFirm,
    Target,
}

/// A deal row. `company_id` is `None` only when the source row carried no
/// usable company reference; assembly rejects such rows, so emitted output
/// always links every deal to a company.
#[derive(Debug, Clone, Serialize)]
pub struct Deal {
    pub deal_id: DealId,
    pub name: Option<String>,
    pub company_id: Option<CompanyId>,
    pub attributes: TypedRecord,
}

/// One longitudinal metric observation, split out of the wide per-year
/// deal columns. Unique on (deal_id, period, metric).
#[derive(Debug, Clone, Serialize)]
pub struct FinancialMetric {
    pub deal_id: DealId,
    pub period: i32,
    pub metric: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Company {
    pub company_id: CompanyId,
    pub name: String,
    pub name_lower: String,
    pub kind: CompanyKind,
    pub attributes: TypedRecord,
}

/// Master identity registry row for a person. `email` is stored in its
/// normalized form and is unique across the table when present.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub contact_id: ContactId,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub attributes: TypedRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketingParticipant {
    pub participant_id: ParticipantId,
    pub event: Option<String>,
    pub contact_id: ContactId,
    pub attributes: TypedRecord,
}

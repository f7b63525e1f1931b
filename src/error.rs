use thiserror::Error;

use crate::domain::EntityKind;
use crate::pipeline::processing::audit::{DuplicateEmailCluster, IntegrityViolation};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot coerce {table}.{column} row {row} value '{value}' to {expected}")]
    TypeCoercion {
        table: String,
        column: String,
        row: usize,
        value: String,
        expected: String,
    },

    #[error("identifier space exhausted for {kind} (cap {cap})")]
    IdentifierExhaustion { kind: EntityKind, cap: u64 },

    #[error("duplicate contact identities: {} normalized email(s) map to more than one contact", clusters.len())]
    DuplicateIdentity { clusters: Vec<DuplicateEmailCluster> },

    #[error("referential integrity violated: {} problem(s) found", violations.len())]
    ReferentialIntegrity { violations: Vec<IntegrityViolation> },

    #[error("schema registry error: {0}")]
    Registry(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

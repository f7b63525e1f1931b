// Pipeline processing: typed normalization, identity assignment, and
// table assembly

pub mod assemble;
pub mod audit;
pub mod companies;
pub mod financials;
pub mod mint;
pub mod normalize;
pub mod reconcile;

// Re-export key types and functions
pub use assemble::{assemble, AssembledTables};
pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use companies::CompanyLedger;
pub use financials::MetricSplitter;
pub use mint::IdMinter;
pub use normalize::FieldNormalizer;
pub use reconcile::{ContactMaster, Reconciler};

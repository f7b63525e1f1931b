//! Entity reconciliation for private-equity deal flow exports.
//!
//! One snapshot of raw spreadsheet exports goes in; five normalized,
//! relationally-linked tables come out. The stages run in a fixed
//! order: typed normalization, financial cell scrubbing, historical
//! metric splitting, identity minting, participant reconciliation, and
//! assembly with referential integrity checks.

pub mod common;
pub mod domain;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod registry;

pub use error::{PipelineError, Result};
pub use pipeline::{PipelineOutput, PipelineRunner, Snapshot};
pub use registry::SchemaRegistry;

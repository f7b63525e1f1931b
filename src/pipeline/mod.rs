// Pipeline orchestration and processing modules

pub mod ingestion;
pub mod orchestrator;
pub mod processing;

// Re-export key types for convenience
pub use ingestion::Snapshot;
pub use orchestrator::{PipelineOutput, PipelineRunner, RunSummary};
pub use processing::AssembledTables;

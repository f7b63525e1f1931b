// Ingestion: loading raw snapshot exports and stamping provenance

pub mod envelope;
pub mod reader;

pub use envelope::BatchEnvelope;
pub use reader::{RawBatch, RawRecord, Snapshot};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Serialize, Clone)]
pub struct ChecksumMeta {
    pub sha256: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct PayloadMeta {
    pub size_bytes: u64,
    pub checksum: ChecksumMeta,
}

/// Provenance stamp for one ingested table file. Every batch that enters
/// the pipeline carries one so a given output row can be traced back to
/// the exact snapshot bytes it came from.
#[derive(Debug, Serialize, Clone)]
pub struct BatchEnvelope {
    pub batch_id: String,
    pub table: String,
    pub source_path: String,
    pub payload: PayloadMeta,
    pub row_count: usize,
    pub received_at: DateTime<Utc>,
}

impl BatchEnvelope {
    pub fn stamp(table: &str, source_path: &Path, bytes: &[u8], row_count: usize) -> Self {
        let sha256 = {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        };
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            table: table.to_string(),
            source_path: source_path.display().to_string(),
            payload: PayloadMeta {
                size_bytes: bytes.len() as u64,
                checksum: ChecksumMeta { sha256 },
            },
            row_count,
            received_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_fingerprints_payload_bytes() {
        let bytes = br#"[{"Deal Name": "Acme"}]"#;
        let envelope = BatchEnvelope::stamp("deals", Path::new("deals.json"), bytes, 1);

        assert_eq!(envelope.table, "deals");
        assert_eq!(envelope.row_count, 1);
        assert_eq!(envelope.payload.size_bytes, bytes.len() as u64);
        // sha256 is hex-encoded, 32 bytes
        assert_eq!(envelope.payload.checksum.sha256.len(), 64);

        let again = BatchEnvelope::stamp("deals", Path::new("deals.json"), bytes, 1);
        assert_eq!(
            envelope.payload.checksum.sha256,
            again.payload.checksum.sha256
        );
        assert_ne!(envelope.batch_id, again.batch_id);
    }
}

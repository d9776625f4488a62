//! Stage tracing: content hashes and latency for each pipeline step
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Trace of one executed step (`call`, `parse`, `fallback`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTrace {
    pub id: String,
    pub in_hash: String,
    pub out_hash: String,
    pub latency_ms: u64,
}

/// Started when a step begins, consumed when it ends
pub struct StageTimer {
    id: String,
    in_hash: String,
    start: Instant,
}

impl StageTimer {
    pub fn start(id: impl Into<String>, input: &[u8]) -> Self {
        Self {
            id: id.into(),
            in_hash: hash_bytes(input),
            start: Instant::now(),
        }
    }

    pub fn finish(self, output: &[u8]) -> StageTrace {
        StageTrace {
            id: self.id,
            in_hash: self.in_hash,
            out_hash: hash_bytes(output),
            latency_ms: self.start.elapsed().as_millis() as u64,
        }
    }
}

pub fn hash_bytes(data: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(data))
}

/// Compact pipeline label, e.g. `call→parse→fallback`
pub fn pipeline_id(stages: &[StageTrace]) -> String {
    stages
        .iter()
        .map(|s| s.id.split('.').next().unwrap_or("?"))
        .collect::<Vec<_>>()
        .join("→")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_hashes_input_and_output() {
        let trace = StageTimer::start("parse.structured.v1", b"raw").finish(b"parsed");
        assert_eq!(trace.in_hash, hash_bytes(b"raw"));
        assert_eq!(trace.out_hash, hash_bytes(b"parsed"));
        assert!(trace.in_hash.starts_with("blake3:"));
    }

    #[test]
    fn test_pipeline_id() {
        let stages = vec![
            StageTimer::start("call.groq", b"").finish(b""),
            StageTimer::start("parse.structured.v1", b"").finish(b""),
        ];
        assert_eq!(pipeline_id(&stages), "call→parse");
    }
}

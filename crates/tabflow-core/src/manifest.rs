//! Run manifest for audit and replay.
//!
//! The engine emits a manifest after every run; replaying the same definition
//! against the same catalog contents must reproduce `output_digest`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Stable hash of the pipeline definition that was executed.
    pub pipeline_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Digest of the designated output table, when it succeeded.
    pub output_digest: Option<Hash256>,

    pub nodes_succeeded: usize,
    pub nodes_failed: usize,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(pipeline_hash: Hash256, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            pipeline_hash,
            engine_version: crate::VERSION.to_string(),
            output_digest: None,
            nodes_succeeded: 0,
            nodes_failed: 0,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(
        mut self,
        finished_ms: u64,
        output_digest: Option<Hash256>,
        succeeded: usize,
        failed: usize,
    ) -> Self {
        self.finished_ms = finished_ms;
        self.output_digest = output_digest;
        self.nodes_succeeded = succeeded;
        self.nodes_failed = failed;
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}

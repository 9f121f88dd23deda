//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::dag::{StageConfig, StageKind};
pub use crate::diagnostics::{DiagnosticKind, Diagnostics};
pub use crate::error::{Error, Result};
pub use crate::fetch::{FetchError, FetchRequest, TableFetcher};
pub use crate::id::{EdgeId, NodeId};
pub use crate::manifest::{ManifestId, RunManifest};
pub use crate::table::{Row, Table};
pub use crate::types::{DataType, Scalar};

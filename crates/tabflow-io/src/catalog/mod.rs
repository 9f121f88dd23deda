//! `TableFetcher` implementations.
//!
//! - `memory`: versioned tables held in process (tests, embedding).
//! - `fs`: a directory tree of CSV / JSONL / JSON files (the CLI).
//!
//! Both resolve price lists to the pinned version when one is requested and to
//! the highest stored version otherwise. Other entity types are unversioned.

mod fs;
mod memory;

pub use fs::FsCatalog;
pub use memory::MemoryCatalog;

use std::collections::BTreeMap;

use tabflow_core::dag::EntityType;
use tabflow_core::fetch::{FetchError, FetchRequest};

/// Pick the entry for `req` out of a version map.
pub(crate) fn resolve_version<'a, T>(
    req: &FetchRequest,
    versions: &'a BTreeMap<u32, T>,
) -> Result<&'a T, FetchError> {
    if versions.is_empty() {
        return Err(not_found(req));
    }
    let found = match (req.entity_type, req.version) {
        (EntityType::Pricelists, Some(v)) => versions.get(&v).ok_or(FetchError::VersionUnavailable {
            entity_type: req.entity_type,
            name: req.entity_name.clone(),
            version: v,
        })?,
        _ => versions
            .values()
            .next_back()
            .ok_or_else(|| not_found(req))?,
    };
    Ok(found)
}

pub(crate) fn not_found(req: &FetchRequest) -> FetchError {
    FetchError::NotFound {
        entity_type: req.entity_type,
        name: req.entity_name.clone(),
    }
}

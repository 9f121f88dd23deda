//! In-memory catalog.
//!
//! Thread-safe map of entity → version → table, shared by clone.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tabflow_core::dag::EntityType;
use tabflow_core::fetch::{FetchError, FetchRequest, TableFetcher};
use tabflow_core::table::Table;

use super::{not_found, resolve_version};

type Key = (EntityType, String);

#[derive(Clone, Default)]
pub struct MemoryCatalog {
    data: Arc<RwLock<HashMap<Key, BTreeMap<u32, Arc<Table>>>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an unversioned entity (replaces any previous content).
    pub fn insert(&self, entity_type: EntityType, name: impl Into<String>, table: Table) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        let versions = data.entry((entity_type, name.into())).or_default();
        versions.clear();
        versions.insert(1, Arc::new(table));
    }

    /// Store one version of a price list.
    pub fn insert_version(&self, name: impl Into<String>, version: u32, table: Table) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.entry((EntityType::Pricelists, name.into()))
            .or_default()
            .insert(version, Arc::new(table));
    }

    pub fn contains(&self, entity_type: EntityType, name: &str) -> bool {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.contains_key(&(entity_type, name.to_string()))
    }

    /// Number of stored entities (all versions of one entity count once).
    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TableFetcher for MemoryCatalog {
    fn fetch(&self, req: &FetchRequest) -> Result<Table, FetchError> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        let versions = data
            .get(&(req.entity_type, req.entity_name.clone()))
            .ok_or_else(|| not_found(req))?;
        let table = resolve_version(req, versions)?;
        Ok(req.apply_selection(Table::clone(table)))
    }
}

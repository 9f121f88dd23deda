//! The read-only table source that `source` stages pull from.

use thiserror::Error;

use crate::dag::EntityType;
use crate::table::Table;

/// A request for one catalog entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub entity_type: EntityType,
    pub entity_name: String,
    /// Pinned price list version; `None` means latest.
    pub version: Option<u32>,
    /// Columns to keep; empty keeps every column.
    pub selected_columns: Vec<String>,
}

impl FetchRequest {
    pub fn latest(entity_type: EntityType, entity_name: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_name: entity_name.into(),
            version: None,
            selected_columns: Vec::new(),
        }
    }

    /// Narrow `table` to the selected columns, in selection order.
    pub fn apply_selection(&self, table: Table) -> Table {
        if self.selected_columns.is_empty() {
            table
        } else {
            table.project(&self.selected_columns)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("{entity_type} '{name}' not found")]
    NotFound { entity_type: EntityType, name: String },

    #[error("{entity_type} '{name}' has no version {version}")]
    VersionUnavailable {
        entity_type: EntityType,
        name: String,
        version: u32,
    },

    #[error("failed to read {entity_type} '{name}': {reason}")]
    Read {
        entity_type: EntityType,
        name: String,
        reason: String,
    },
}

/// Supplies tables to `source` stages.
///
/// Implementations are shared across concurrently running stages.
pub trait TableFetcher: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> Result<Table, FetchError>;
}

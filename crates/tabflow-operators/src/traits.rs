//! Stage trait + common interfaces.
//!
//! The exec runtime builds one `Stage` per node through the registry, then
//! calls `eval` once all of the node's inputs have produced a table.

use std::sync::Arc;

use tabflow_core::diagnostics::Diagnostics;
use tabflow_core::fetch::{FetchError, TableFetcher};
use tabflow_core::table::Table;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("execution error: {0}")]
    Exec(String),
}

/// Collaborators a stage may need during evaluation.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub fetcher: &'a dyn TableFetcher,
}

/// What a stage produced: its table and the row-level problems it counted.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub table: Arc<Table>,
    pub diagnostics: Diagnostics,
}

impl StageOutput {
    pub fn new(table: Table, diagnostics: Diagnostics) -> Self {
        Self {
            table: Arc::new(table),
            diagnostics,
        }
    }

    /// Output that reuses an existing table without copying it.
    pub fn shared(table: Arc<Table>) -> Self {
        Self {
            table,
            diagnostics: Diagnostics::default(),
        }
    }
}

/// Trait that all stage executors implement.
///
/// Invariants:
/// - `eval` must be deterministic given the same inputs and fetcher contents.
/// - `inputs` arrive in resolved order (join: primary then lookup; union:
///   slot order). Their count matches the kind's arity.
pub trait Stage: Send + Sync + 'static {
    /// Human-readable stage name (stable).
    fn name(&self) -> &'static str;

    fn eval(&self, inputs: &[Arc<Table>], ctx: &StageContext<'_>) -> Result<StageOutput, OpError>;
}

/// Check the input count for a fixed-arity stage.
pub(crate) fn expect_inputs<'a>(
    stage: &str,
    inputs: &'a [Arc<Table>],
    n: usize,
) -> Result<&'a [Arc<Table>], OpError> {
    if inputs.len() != n {
        return Err(OpError::Exec(format!(
            "{stage} expects {n} input(s), got {}",
            inputs.len()
        )));
    }
    Ok(inputs)
}

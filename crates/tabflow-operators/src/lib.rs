#![forbid(unsafe_code)]
//! tabflow-operators: one executor per stage kind, plus the expression and
//! condition evaluators they share.
//!
//! Design intent:
//! - Pure and synchronous; the exec crate decides where stages run.
//! - Stages never mutate their inputs. Each evaluation builds a new `Table`.
//! - Configuration problems surface when a stage is built (`registry`), not
//!   per row. Row-level problems become nulls plus `Diagnostics` counts.

pub mod accum;
pub mod condition;
pub mod expr;
pub mod group;
pub mod registry;
pub mod traits;

pub mod aggregate;
pub mod filter;
pub mod formula;
pub mod join;
pub mod output;
pub mod pivot;
pub mod source;
pub mod union;

#[cfg(test)]
mod testing;

pub use registry::build_stage;
pub use traits::{OpError, Stage, StageContext, StageOutput};

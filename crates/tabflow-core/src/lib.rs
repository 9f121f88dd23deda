#![forbid(unsafe_code)]
//! tabflow-core: the value model, tables, stage configuration records, and
//! the shared plumbing (ids, errors, config, hashing, manifests) every other
//! tabflow crate builds on.
//!
//! No I/O and no async here. Concrete table fetchers live in `tabflow-io`;
//! stage executors live in `tabflow-operators`.

pub mod arith;
pub mod config;
pub mod dag;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod table;
pub mod types;

/// Engine version recorded in run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

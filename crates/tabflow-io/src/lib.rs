#![forbid(unsafe_code)]
//! tabflow-io: where tables come from and where they go.
//!
//! - `catalog`: `TableFetcher` implementations (in-memory, filesystem).
//! - `readers`: CSV / JSONL / JSON-array into `Table`, with type inference.
//! - `writers`: `Table` out as CSV or JSONL.

pub mod catalog;
pub mod error;
pub mod readers;
pub mod writers;

pub use catalog::{FsCatalog, MemoryCatalog};
pub use error::{IoError, Result};

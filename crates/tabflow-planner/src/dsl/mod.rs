//! Alternate surface syntaxes for pipeline definitions.

pub mod yaml;

//! Per-stage counters for recoverable row-level problems.
//!
//! A row that cannot be evaluated (unknown column, division by zero, type
//! clash) does not fail the stage; it is counted here instead.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnknownColumn,
    DivisionByZero,
    TypeMismatch,
    CoercionFailed,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UnknownColumn => "unknown_column",
            DiagnosticKind::DivisionByZero => "division_by_zero",
            DiagnosticKind::TypeMismatch => "type_mismatch",
            DiagnosticKind::CoercionFailed => "coercion_failed",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(BTreeMap<DiagnosticKind, u64>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: DiagnosticKind) {
        *self.0.entry(kind).or_default() += 1;
    }

    pub fn count(&self, kind: DiagnosticKind) -> u64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn merge(&mut self, other: &Diagnostics) {
        for (k, v) in &other.0 {
            *self.0.entry(*k).or_default() += v;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DiagnosticKind, u64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_merge() {
        let mut a = Diagnostics::new();
        a.record(DiagnosticKind::DivisionByZero);
        a.record(DiagnosticKind::DivisionByZero);
        let mut b = Diagnostics::new();
        b.record(DiagnosticKind::UnknownColumn);
        a.merge(&b);
        assert_eq!(a.count(DiagnosticKind::DivisionByZero), 2);
        assert_eq!(a.total(), 3);
        assert_eq!(a.to_string(), "unknown_column=1, division_by_zero=2");
    }
}

//! Filter conditions compiled from their editor form.
//!
//! Literals stay as text until a row is evaluated; each is then coerced to the
//! type of the cell it is compared against. `between` is the exception: its
//! bounds are typed once at compile time, and a text cell is read as that type
//! so the range means the same thing at validation and at evaluation. A
//! coercion or comparison failure is a `TypeError` for that row, never a stage
//! failure.

use tabflow_core::dag::{BoolOp, Condition, ConditionOp};
use tabflow_core::diagnostics::{DiagnosticKind, Diagnostics};
use tabflow_core::table::Row;
use tabflow_core::types::{coerce, compare, order, CompareOp, DataType, Scalar, TypeError};

use crate::traits::OpError;

#[derive(Debug, Clone, PartialEq)]
enum Test {
    Compare(CompareOp, String),
    In(Vec<String>),
    NotIn(Vec<String>),
    Contains(String),
    DoesNotContain(String),
    StartsWith(String),
    EndsWith(String),
    IsEmpty,
    IsNonEmpty,
    Between(Range),
}

/// Inclusive `between` bounds, inferred from their literals.
#[derive(Debug, Clone, PartialEq)]
struct Range {
    lo_raw: String,
    hi_raw: String,
    lo: Scalar,
    hi: Scalar,
}

impl Range {
    fn contains(&self, cell: &Scalar) -> Result<bool, TypeError> {
        let (value, lo, hi) = match (cell, self.lo.data_type()) {
            (Scalar::Text(_), Some(dt)) if dt != DataType::Text => {
                (coerce(cell, &dt)?, self.lo.clone(), self.hi.clone())
            }
            _ => (
                cell.clone(),
                literal_like(cell, &self.lo_raw)?,
                literal_like(cell, &self.hi_raw)?,
            ),
        };
        Ok(compare(&value, &lo, CompareOp::Ge)? && compare(&value, &hi, CompareOp::Le)?)
    }
}

/// One validated condition, ready to evaluate against rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    field: String,
    test: Test,
}

impl CompiledCondition {
    pub fn compile(cond: &Condition) -> Result<Self, OpError> {
        let field = cond.field_id.trim();
        if field.is_empty() {
            return Err(OpError::Config("condition is missing fieldId".into()));
        }
        let value = || {
            cond.value.clone().ok_or_else(|| {
                OpError::Config(format!("condition on '{field}' is missing a value"))
            })
        };
        let test = match cond.operator {
            ConditionOp::IsEmpty => Test::IsEmpty,
            ConditionOp::IsNonEmpty => Test::IsNonEmpty,
            ConditionOp::In => Test::In(split_members(&value()?)),
            ConditionOp::NotIn => Test::NotIn(split_members(&value()?)),
            ConditionOp::Contains => Test::Contains(value()?),
            ConditionOp::DoesNotContain => Test::DoesNotContain(value()?),
            ConditionOp::StartsWith => Test::StartsWith(value()?),
            ConditionOp::EndsWith => Test::EndsWith(value()?),
            ConditionOp::Between => {
                let lo = value()?;
                let hi = cond.value_to.clone().ok_or_else(|| {
                    OpError::Config(format!("between on '{field}' is missing valueTo"))
                })?;
                Test::Between(check_bounds(field, lo, hi)?)
            }
            op => {
                let cmp = op.as_compare().ok_or_else(|| {
                    OpError::Config(format!("unsupported operator on '{field}'"))
                })?;
                Test::Compare(cmp, value()?)
            }
        };
        Ok(Self {
            field: field.to_string(),
            test,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Evaluate against one row.
    pub fn eval(&self, row: &Row) -> Result<bool, TypeError> {
        let cell = row.value(&self.field);
        match &self.test {
            Test::IsEmpty => Ok(cell.is_empty_value()),
            Test::IsNonEmpty => Ok(!cell.is_empty_value()),
            Test::NotIn(_) | Test::DoesNotContain(_) if cell.is_null() => Ok(true),
            Test::Compare(op, _) if cell.is_null() => Ok(*op == CompareOp::Ne),
            _ if cell.is_null() => Ok(false),
            Test::Compare(op, lit) => compare(cell, &literal_like(cell, lit)?, *op),
            Test::In(members) => is_member(cell, members),
            Test::NotIn(members) => is_member(cell, members).map(|hit| !hit),
            Test::Contains(s) => Ok(cell.to_text().contains(s.as_str())),
            Test::DoesNotContain(s) => Ok(!cell.to_text().contains(s.as_str())),
            Test::StartsWith(s) => Ok(cell.to_text().starts_with(s.as_str())),
            Test::EndsWith(s) => Ok(cell.to_text().ends_with(s.as_str())),
            Test::Between(range) => range.contains(cell),
        }
    }
}

/// A flat AND / OR group of conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    op: BoolOp,
    conditions: Vec<CompiledCondition>,
}

impl ConditionGroup {
    pub fn compile(op: BoolOp, conditions: &[Condition]) -> Result<Self, OpError> {
        Ok(Self {
            op,
            conditions: conditions
                .iter()
                .map(CompiledCondition::compile)
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether `row` passes. Every condition is evaluated so diagnostics do not
    /// depend on condition order; a condition that errors counts as false.
    pub fn matches(&self, row: &Row, diagnostics: &mut Diagnostics) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        let outcomes: Vec<bool> = self
            .conditions
            .iter()
            .map(|c| match c.eval(row) {
                Ok(hit) => hit,
                Err(_) => {
                    diagnostics.record(DiagnosticKind::TypeMismatch);
                    false
                }
            })
            .collect();
        match self.op {
            BoolOp::And => outcomes.iter().all(|hit| *hit),
            BoolOp::Or => outcomes.iter().any(|hit| *hit),
        }
    }
}

fn split_members(raw: &str) -> Vec<String> {
    raw.split(',').map(|m| m.trim().to_string()).collect()
}

/// Coerce a text literal to the type of `cell`.
fn literal_like(cell: &Scalar, literal: &str) -> Result<Scalar, TypeError> {
    let text = Scalar::text(literal);
    match cell.data_type() {
        Some(dt) => coerce(&text, &dt),
        None => Ok(text),
    }
}

fn is_member(cell: &Scalar, members: &[String]) -> Result<bool, TypeError> {
    for m in members {
        if compare(cell, &literal_like(cell, m)?, CompareOp::Eq)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Type `between` bounds and reject them when inverted or not mutually comparable.
fn check_bounds(field: &str, lo_raw: String, hi_raw: String) -> Result<Range, OpError> {
    let (lo, hi) = (Scalar::infer(&lo_raw), Scalar::infer(&hi_raw));
    if lo.is_null() || hi.is_null() {
        return Err(OpError::Config(format!("between on '{field}' has an empty bound")));
    }
    match order(&lo, &hi, "between") {
        Ok(std::cmp::Ordering::Greater) => Err(OpError::Config(format!(
            "between on '{field}': lower bound {lo_raw} exceeds upper bound {hi_raw}"
        ))),
        Ok(_) => Ok(Range {
            lo_raw,
            hi_raw,
            lo,
            hi,
        }),
        Err(e) => Err(OpError::Config(format!("between on '{field}': {e}"))),
    }
}

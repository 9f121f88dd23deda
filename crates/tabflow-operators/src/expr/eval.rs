use std::collections::HashSet;

use tabflow_core::arith::{self, ArithError};
use tabflow_core::diagnostics::DiagnosticKind;
use tabflow_core::table::Row;
use tabflow_core::types::{coerce, compare, DataType, Money, Scalar};

use super::Expr;

/// Result of evaluating one expression against one row.
///
/// When `issue` is set the value is always null.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub value: Scalar,
    pub issue: Option<DiagnosticKind>,
}

impl Evaluated {
    fn failed(kind: DiagnosticKind) -> Self {
        Self {
            value: Scalar::Null,
            issue: Some(kind),
        }
    }
}

/// Evaluate `expr` against `row` and coerce the result to `declared`.
///
/// `known` is the input table's column set; a reference outside it is an
/// unknown column even though sparse rows read missing cells as null.
/// Money declared without a currency keeps whatever currency the result
/// carries; only a plain number takes `default_currency`.
pub fn evaluate(
    expr: &Expr,
    row: &Row,
    known: &HashSet<String>,
    declared: &DataType,
    default_currency: &str,
) -> Evaluated {
    let value = match eval_raw(expr, row, known) {
        Ok(value) => value,
        Err(kind) => return Evaluated::failed(kind),
    };
    let target = match (declared, &value) {
        (DataType::Money { currency: None }, Scalar::Money(_)) => declared.clone(),
        (DataType::Money { currency: None }, _) => DataType::Money {
            currency: Some(default_currency.to_string()),
        },
        _ => declared.clone(),
    };
    match coerce(&value, &target) {
        Ok(value) => Evaluated { value, issue: None },
        Err(_) => Evaluated::failed(DiagnosticKind::CoercionFailed),
    }
}

fn eval_raw(expr: &Expr, row: &Row, known: &HashSet<String>) -> Result<Scalar, DiagnosticKind> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Column(name) => {
            if known.contains(name) {
                Ok(row.value(name).clone())
            } else {
                Err(DiagnosticKind::UnknownColumn)
            }
        }
        Expr::Neg(inner) => negate(eval_raw(inner, row, known)?),
        Expr::Arith { op, left, right } => {
            let l = eval_raw(left, row, known)?;
            let r = eval_raw(right, row, known)?;
            arith::apply(*op, &l, &r).map_err(|e| match e {
                ArithError::DivisionByZero => DiagnosticKind::DivisionByZero,
                ArithError::Type(_) => DiagnosticKind::TypeMismatch,
            })
        }
        Expr::Compare { op, left, right } => {
            let l = eval_raw(left, row, known)?;
            let r = eval_raw(right, row, known)?;
            compare(&l, &r, *op)
                .map(Scalar::Bool)
                .map_err(|_| DiagnosticKind::TypeMismatch)
        }
    }
}

fn negate(v: Scalar) -> Result<Scalar, DiagnosticKind> {
    Ok(match v {
        Scalar::Null => Scalar::Null,
        Scalar::Number(x) => Scalar::Number(-x),
        Scalar::Percentage(x) => Scalar::Percentage(-x),
        Scalar::Money(Money { amount, currency }) => Scalar::Money(Money {
            amount: -amount,
            currency,
        }),
        _ => return Err(DiagnosticKind::TypeMismatch),
    })
}

//! Arithmetic over scalars, shared by the formula evaluator and aggregations.
//!
//! Money never combines across currencies; percentages behave as their ratio
//! except when added to or subtracted from another percentage.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{incompatible, Money, Scalar, TypeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }

    fn apply_f64(self, x: f64, y: f64) -> f64 {
        match self {
            ArithOp::Add => x + y,
            ArithOp::Sub => x - y,
            ArithOp::Mul => x * y,
            ArithOp::Div => x / y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArithError {
    #[error("division by zero")]
    DivisionByZero,

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Apply `a op b`. Either operand being null yields null.
pub fn apply(op: ArithOp, a: &Scalar, b: &Scalar) -> Result<Scalar, ArithError> {
    use Scalar::*;

    if a.is_null() || b.is_null() {
        return Ok(Null);
    }
    if op == ArithOp::Div && matches!(b.as_f64(), Some(d) if d == 0.0) {
        return Err(ArithError::DivisionByZero);
    }
    let bad = || ArithError::Type(incompatible(a, op.symbol(), b));

    let out = match (a, b) {
        (Number(x), Number(y)) => Number(op.apply_f64(*x, *y)),
        (Percentage(x), Percentage(y)) => match op {
            ArithOp::Add | ArithOp::Sub => Percentage(op.apply_f64(*x, *y)),
            ArithOp::Mul | ArithOp::Div => Number(op.apply_f64(*x, *y)),
        },
        (Number(x), Percentage(y)) | (Percentage(x), Number(y)) => Number(op.apply_f64(*x, *y)),
        (Money(x), Money(y)) => {
            if x.currency != y.currency {
                return Err(TypeError::CurrencyMismatch {
                    left: x.currency.clone(),
                    right: y.currency.clone(),
                }
                .into());
            }
            match op {
                ArithOp::Add | ArithOp::Sub => money(op.apply_f64(x.amount, y.amount), x),
                ArithOp::Div => Number(x.amount / y.amount),
                ArithOp::Mul => return Err(bad()),
            }
        }
        (Money(m), Number(y) | Percentage(y)) => money(op.apply_f64(m.amount, *y), m),
        (Number(x) | Percentage(x), Money(m)) => match op {
            ArithOp::Div => return Err(bad()),
            _ => money(op.apply_f64(*x, m.amount), m),
        },
        (Date(d), Number(n)) => match op {
            ArithOp::Add => Date(shift_days(*d, *n).ok_or_else(bad)?),
            ArithOp::Sub => Date(shift_days(*d, -*n).ok_or_else(bad)?),
            _ => return Err(bad()),
        },
        (Number(n), Date(d)) if op == ArithOp::Add => Date(shift_days(*d, *n).ok_or_else(bad)?),
        (Date(x), Date(y)) if op == ArithOp::Sub => Number((*x - *y).num_days() as f64),
        _ => return Err(bad()),
    };
    Ok(out)
}

fn money(amount: f64, like: &Money) -> Scalar {
    Scalar::Money(Money {
        amount,
        currency: like.currency.clone(),
    })
}

fn shift_days(d: chrono::NaiveDate, days: f64) -> Option<chrono::NaiveDate> {
    if !days.is_finite() {
        return None;
    }
    d.checked_add_signed(Duration::try_days(days.trunc() as i64)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_date;

    #[test]
    fn numbers_and_money() {
        let usd = Scalar::money(100.0, "USD");
        assert_eq!(
            apply(ArithOp::Sub, &usd, &Scalar::Number(15.0)).unwrap(),
            Scalar::money(85.0, "USD")
        );
        assert_eq!(
            apply(ArithOp::Div, &usd, &Scalar::money(50.0, "USD")).unwrap(),
            Scalar::Number(2.0)
        );
    }

    #[test]
    fn money_across_currencies_is_rejected() {
        let err = apply(
            ArithOp::Add,
            &Scalar::money(1.0, "USD"),
            &Scalar::money(1.0, "EUR"),
        )
        .unwrap_err();
        assert!(matches!(err, ArithError::Type(TypeError::CurrencyMismatch { .. })));
    }

    #[test]
    fn division_by_zero() {
        let err = apply(ArithOp::Div, &Scalar::Number(1.0), &Scalar::Number(0.0)).unwrap_err();
        assert_eq!(err, ArithError::DivisionByZero);
    }

    #[test]
    fn null_propagates() {
        assert_eq!(
            apply(ArithOp::Mul, &Scalar::Null, &Scalar::Number(2.0)).unwrap(),
            Scalar::Null
        );
    }

    #[test]
    fn date_arithmetic() {
        let d = Scalar::Date(parse_date("2024-02-28").unwrap());
        let next = apply(ArithOp::Add, &d, &Scalar::Number(2.0)).unwrap();
        assert_eq!(next, Scalar::Date(parse_date("2024-03-01").unwrap()));
        assert_eq!(apply(ArithOp::Sub, &next, &d).unwrap(), Scalar::Number(2.0));
    }

    #[test]
    fn text_is_incompatible() {
        let err = apply(ArithOp::Add, &Scalar::text("a"), &Scalar::Number(1.0)).unwrap_err();
        assert!(matches!(err, ArithError::Type(TypeError::Incompatible { .. })));
    }
}

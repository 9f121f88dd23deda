//! Aggregate accumulators shared by the aggregate and pivot stages.

use std::collections::HashSet;

use tabflow_core::arith::{self, ArithError, ArithOp};
use tabflow_core::dag::AggFunction;
use tabflow_core::types::{order, Money, Scalar, TypeError};

#[derive(Debug, Clone)]
enum State {
    Sum(Option<Scalar>),
    Avg(Option<Scalar>, u64),
    Min(Option<Scalar>),
    Max(Option<Scalar>),
    Count(u64),
    CountDistinct(HashSet<Vec<u8>>),
}

/// Running state of one aggregate cell.
///
/// The first incompatible value poisons the accumulator; `finish` then
/// reports the error and the caller emits null.
#[derive(Debug, Clone)]
pub struct Accumulator {
    state: State,
    error: Option<TypeError>,
}

impl Accumulator {
    pub fn new(function: AggFunction) -> Self {
        let state = match function {
            AggFunction::Sum => State::Sum(None),
            AggFunction::Avg => State::Avg(None, 0),
            AggFunction::Min => State::Min(None),
            AggFunction::Max => State::Max(None),
            AggFunction::Count => State::Count(0),
            AggFunction::CountDistinct => State::CountDistinct(HashSet::new()),
        };
        Self { state, error: None }
    }

    /// Feed one row's value. `count` counts rows, so nulls are fed too.
    pub fn update(&mut self, value: &Scalar) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.try_update(value) {
            self.error = Some(e);
        }
    }

    fn try_update(&mut self, value: &Scalar) -> Result<(), TypeError> {
        if let State::Count(n) = &mut self.state {
            *n += 1;
            return Ok(());
        }
        if value.is_null() {
            return Ok(());
        }
        match &mut self.state {
            State::Sum(acc) => add_into(acc, value)?,
            State::Avg(acc, n) => {
                add_into(acc, value)?;
                *n += 1;
            }
            State::Min(acc) => keep_extreme(acc, value, std::cmp::Ordering::Less)?,
            State::Max(acc) => keep_extreme(acc, value, std::cmp::Ordering::Greater)?,
            State::CountDistinct(seen) => {
                let mut key = Vec::new();
                value.write_key(&mut key);
                seen.insert(key);
            }
            State::Count(_) => {}
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Scalar, TypeError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(match self.state {
            State::Sum(acc) | State::Min(acc) | State::Max(acc) => acc.unwrap_or(Scalar::Null),
            State::Avg(None, _) | State::Avg(_, 0) => Scalar::Null,
            State::Avg(Some(sum), n) => mean(sum, n),
            State::Count(n) => Scalar::Number(n as f64),
            State::CountDistinct(seen) => Scalar::Number(seen.len() as f64),
        })
    }
}

fn add_into(acc: &mut Option<Scalar>, value: &Scalar) -> Result<(), TypeError> {
    if value.as_f64().is_none() {
        return Err(TypeError::Incompatible {
            left: "sum",
            op: "+",
            right: value.type_name(),
        });
    }
    let next = match acc.take() {
        None => value.clone(),
        Some(prev) => arith::apply(ArithOp::Add, &prev, value).map_err(|e| match e {
            ArithError::Type(t) => t,
            ArithError::DivisionByZero => TypeError::Incompatible {
                left: prev.type_name(),
                op: "+",
                right: value.type_name(),
            },
        })?,
    };
    *acc = Some(next);
    Ok(())
}

fn keep_extreme(
    acc: &mut Option<Scalar>,
    value: &Scalar,
    wanted: std::cmp::Ordering,
) -> Result<(), TypeError> {
    match acc {
        None => *acc = Some(value.clone()),
        Some(cur) => {
            if order(value, cur, "compare")? == wanted {
                *cur = value.clone();
            }
        }
    }
    Ok(())
}

fn mean(sum: Scalar, n: u64) -> Scalar {
    let n = n as f64;
    match sum {
        Scalar::Percentage(v) => Scalar::Percentage(v / n),
        Scalar::Money(Money { amount, currency }) => Scalar::Money(Money {
            amount: amount / n,
            currency,
        }),
        other => other.as_f64().map(|v| Scalar::Number(v / n)).unwrap_or(Scalar::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(function: AggFunction, values: &[Scalar]) -> Result<Scalar, TypeError> {
        let mut acc = Accumulator::new(function);
        for v in values {
            acc.update(v);
        }
        acc.finish()
    }

    #[test]
    fn sum_and_avg_ignore_nulls() {
        let vals = [Scalar::Number(2.0), Scalar::Null, Scalar::Number(4.0)];
        assert_eq!(run(AggFunction::Sum, &vals).unwrap(), Scalar::Number(6.0));
        assert_eq!(run(AggFunction::Avg, &vals).unwrap(), Scalar::Number(3.0));
        assert_eq!(run(AggFunction::Count, &vals).unwrap(), Scalar::Number(3.0));
    }

    #[test]
    fn all_null_sum_is_null() {
        assert_eq!(run(AggFunction::Sum, &[Scalar::Null]).unwrap(), Scalar::Null);
        assert_eq!(run(AggFunction::Avg, &[]).unwrap(), Scalar::Null);
        assert_eq!(run(AggFunction::CountDistinct, &[Scalar::Null]).unwrap(), Scalar::Number(0.0));
    }

    #[test]
    fn money_sum_keeps_currency() {
        let vals = [Scalar::money(1.5, "EUR"), Scalar::money(2.5, "EUR")];
        assert_eq!(run(AggFunction::Sum, &vals).unwrap(), Scalar::money(4.0, "EUR"));
        assert_eq!(run(AggFunction::Avg, &vals).unwrap(), Scalar::money(2.0, "EUR"));
    }

    #[test]
    fn incompatible_values_poison() {
        let err = run(AggFunction::Sum, &[Scalar::Number(1.0), Scalar::text("x")]).unwrap_err();
        assert!(matches!(err, TypeError::Incompatible { .. }));
        let err = run(
            AggFunction::Sum,
            &[Scalar::money(1.0, "USD"), Scalar::money(1.0, "EUR")],
        )
        .unwrap_err();
        assert!(matches!(err, TypeError::CurrencyMismatch { .. }));
    }

    #[test]
    fn min_max_over_text_and_dates() {
        let vals = [Scalar::text("b"), Scalar::text("a"), Scalar::text("c")];
        assert_eq!(run(AggFunction::Min, &vals).unwrap(), Scalar::text("a"));
        assert_eq!(run(AggFunction::Max, &vals).unwrap(), Scalar::text("c"));
    }

    #[test]
    fn count_distinct_by_value() {
        let vals = [
            Scalar::text("a"),
            Scalar::text("a"),
            Scalar::Number(1.0),
            Scalar::Null,
        ];
        assert_eq!(run(AggFunction::CountDistinct, &vals).unwrap(), Scalar::Number(2.0));
    }
}

//! Scalar values, declared data types, coercion and comparison.
//!
//! Every cell in a `Table` is a `Scalar`. Configuration literals (filter
//! values, pivot headers) stay text until evaluation, where they are coerced
//! against the type of the cell they are compared with.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currency assumed for money values whose type declares none.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Calendar date layout accepted in literals and emitted in output.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared result type of a formula field or coercion target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataType {
    Number,
    Money {
        #[serde(default)]
        currency: Option<String>,
    },
    Percentage,
    Text,
    Date,
    Boolean,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Number => "number",
            DataType::Money { .. } => "money",
            DataType::Percentage => "percentage",
            DataType::Text => "text",
            DataType::Date => "date",
            DataType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    #[default]
    Null,
    Number(f64),
    Money(Money),
    /// Stored as a ratio: 25% is `0.25`.
    Percentage(f64),
    Text(String),
    Date(NaiveDate),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("cannot coerce {from} value '{value}' to {to}")]
    Coerce {
        from: &'static str,
        to: &'static str,
        value: String,
    },

    #[error("incompatible operands: {left} {op} {right}")]
    Incompatible {
        left: &'static str,
        op: &'static str,
        right: &'static str,
    },

    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("malformed date literal '{0}'")]
    MalformedDate(String),
}

/// Comparison operators shared by conditions and expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }
}

impl Scalar {
    pub fn number(v: f64) -> Self {
        Scalar::Number(v)
    }

    pub fn text(v: impl Into<String>) -> Self {
        Scalar::Text(v.into())
    }

    pub fn money(amount: f64, currency: impl Into<String>) -> Self {
        Scalar::Money(Money {
            amount,
            currency: currency.into(),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Null and the empty string are both "empty".
    pub fn is_empty_value(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Number(_) => "number",
            Scalar::Money(_) => "money",
            Scalar::Percentage(_) => "percentage",
            Scalar::Text(_) => "text",
            Scalar::Date(_) => "date",
            Scalar::Bool(_) => "boolean",
        }
    }

    /// The declared type this value carries (`None` for null).
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Scalar::Null => return None,
            Scalar::Number(_) => DataType::Number,
            Scalar::Money(m) => DataType::Money {
                currency: Some(m.currency.clone()),
            },
            Scalar::Percentage(_) => DataType::Percentage,
            Scalar::Text(_) => DataType::Text,
            Scalar::Date(_) => DataType::Date,
            Scalar::Bool(_) => DataType::Boolean,
        })
    }

    /// Numeric view of number, percentage, and money values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(v) | Scalar::Percentage(v) => Some(*v),
            Scalar::Money(m) => Some(m.amount),
            _ => None,
        }
    }

    /// Textual representation used by substring operators and pivot headers.
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Number(v) => format_number(*v),
            Scalar::Money(m) => format!("{} {}", format_number(m.amount), m.currency),
            Scalar::Percentage(v) => format!("{}%", format_number(v * 100.0)),
            Scalar::Text(s) => s.clone(),
            Scalar::Date(d) => d.format(DATE_FORMAT).to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    /// Infer a typed value from raw text (CSV cells, untyped literals).
    ///
    /// Empty → null, `true`/`false` → boolean, numeric → number,
    /// `YYYY-MM-DD` → date, anything else stays text.
    pub fn infer(raw: &str) -> Scalar {
        let s = raw.trim();
        if s.is_empty() {
            return Scalar::Null;
        }
        if s.eq_ignore_ascii_case("true") {
            return Scalar::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return Scalar::Bool(false);
        }
        if let Some(v) = parse_number(s) {
            return Scalar::Number(v);
        }
        if let Some(d) = parse_date(s) {
            return Scalar::Date(d);
        }
        Scalar::Text(raw.to_string())
    }

    /// Convert a JSON cell into a scalar.
    ///
    /// Objects with `amount` + `currency` are money, objects with a single
    /// `percentage` key are percentages, ISO date strings are dates.
    pub fn from_json(value: &serde_json::Value) -> Scalar {
        use serde_json::Value;
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Null),
            Value::String(s) => match parse_date(s) {
                Some(d) if s.len() == 10 => Scalar::Date(d),
                _ => Scalar::Text(s.clone()),
            },
            Value::Object(obj) => {
                let amount = obj.get("amount").and_then(Value::as_f64);
                let currency = obj.get("currency").and_then(Value::as_str);
                if let (Some(amount), Some(currency)) = (amount, currency) {
                    return Scalar::money(amount, currency);
                }
                if let Some(p) = obj.get("percentage").and_then(Value::as_f64) {
                    return Scalar::Percentage(p);
                }
                Scalar::Text(value.to_string())
            }
            Value::Array(_) => Scalar::Text(value.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Value};
        match self {
            Scalar::Null => Value::Null,
            Scalar::Number(v) => json!(v),
            Scalar::Money(m) => json!({ "amount": m.amount, "currency": m.currency }),
            Scalar::Percentage(v) => json!({ "percentage": v }),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            Scalar::Bool(b) => Value::Bool(*b),
        }
    }

    /// Append a canonical byte encoding of this value to `out`.
    ///
    /// Two scalars encode identically iff they are the same type with the same
    /// payload, so the encoding can key hash maps for grouping and joins.
    pub fn write_key(&self, out: &mut Vec<u8>) {
        out.push(self.type_order());
        match self {
            Scalar::Null => {}
            Scalar::Number(v) | Scalar::Percentage(v) => {
                out.extend_from_slice(&canonical_bits(*v).to_le_bytes());
            }
            Scalar::Money(m) => {
                out.extend_from_slice(&canonical_bits(m.amount).to_le_bytes());
                write_len_prefixed(out, m.currency.as_bytes());
            }
            Scalar::Text(s) => write_len_prefixed(out, s.as_bytes()),
            Scalar::Date(d) => {
                use chrono::Datelike;
                out.extend_from_slice(&d.num_days_from_ce().to_le_bytes());
            }
            Scalar::Bool(b) => out.push(*b as u8),
        }
    }

    fn type_order(&self) -> u8 {
        match self {
            Scalar::Null => 0,
            Scalar::Bool(_) => 1,
            Scalar::Number(_) => 2,
            Scalar::Percentage(_) => 3,
            Scalar::Money(_) => 4,
            Scalar::Date(_) => 5,
            Scalar::Text(_) => 6,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Number(v as f64)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(v: NaiveDate) -> Self {
        Scalar::Date(v)
    }
}

/// Coerce `value` to `target`. Null coerces to null for every type.
pub fn coerce(value: &Scalar, target: &DataType) -> Result<Scalar, TypeError> {
    if value.is_null() {
        return Ok(Scalar::Null);
    }
    let fail = || TypeError::Coerce {
        from: value.type_name(),
        to: target.name(),
        value: value.to_text(),
    };

    match target {
        DataType::Number => match value {
            Scalar::Number(v) | Scalar::Percentage(v) => Ok(Scalar::Number(*v)),
            Scalar::Money(m) => Ok(Scalar::Number(m.amount)),
            Scalar::Text(s) => parse_number(s.trim()).map(Scalar::Number).ok_or_else(fail),
            _ => Err(fail()),
        },
        DataType::Money { currency } => {
            let wanted = currency.as_deref();
            match value {
                Scalar::Money(m) => match wanted {
                    Some(c) if c != m.currency => Err(TypeError::CurrencyMismatch {
                        left: m.currency.clone(),
                        right: c.to_string(),
                    }),
                    _ => Ok(value.clone()),
                },
                Scalar::Number(v) | Scalar::Percentage(v) => {
                    Ok(Scalar::money(*v, wanted.unwrap_or(DEFAULT_CURRENCY)))
                }
                Scalar::Text(s) => parse_number(s.trim())
                    .map(|v| Scalar::money(v, wanted.unwrap_or(DEFAULT_CURRENCY)))
                    .ok_or_else(fail),
                _ => Err(fail()),
            }
        }
        DataType::Percentage => match value {
            Scalar::Number(v) | Scalar::Percentage(v) => Ok(Scalar::Percentage(*v)),
            Scalar::Text(s) => {
                let s = s.trim();
                let parsed = match s.strip_suffix('%') {
                    Some(head) => parse_number(head.trim()).map(|v| v / 100.0),
                    None => parse_number(s),
                };
                parsed.map(Scalar::Percentage).ok_or_else(fail)
            }
            _ => Err(fail()),
        },
        DataType::Text => Ok(Scalar::Text(value.to_text())),
        DataType::Date => match value {
            Scalar::Date(_) => Ok(value.clone()),
            Scalar::Text(s) => parse_date(s.trim())
                .map(Scalar::Date)
                .ok_or_else(|| TypeError::MalformedDate(s.clone())),
            _ => Err(fail()),
        },
        DataType::Boolean => match value {
            Scalar::Bool(_) => Ok(value.clone()),
            Scalar::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Scalar::Bool(true)),
                "false" => Ok(Scalar::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
    }
}

/// Evaluate `a op b`.
///
/// Null only equals null; ordering against null is always false.
pub fn compare(a: &Scalar, b: &Scalar, op: CompareOp) -> Result<bool, TypeError> {
    if a.is_null() || b.is_null() {
        return Ok(match op {
            CompareOp::Eq => a.is_null() && b.is_null(),
            CompareOp::Ne => a.is_null() != b.is_null(),
            _ => false,
        });
    }
    let ord = order(a, b, op.symbol())?;
    Ok(match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Ge => ord != Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
    })
}

/// Total order between two non-null, type-compatible values.
pub fn order(a: &Scalar, b: &Scalar, op: &'static str) -> Result<Ordering, TypeError> {
    use Scalar::*;
    match (a, b) {
        (Money(x), Money(y)) => {
            if x.currency != y.currency {
                return Err(TypeError::CurrencyMismatch {
                    left: x.currency.clone(),
                    right: y.currency.clone(),
                });
            }
            Ok(cmp_f64(x.amount, y.amount))
        }
        (Number(_) | Percentage(_) | Money(_), Number(_) | Percentage(_) | Money(_)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(cmp_f64(x, y)),
                _ => Err(incompatible(a, op, b)),
            }
        }
        (Text(x), Text(y)) => Ok(x.cmp(y)),
        (Date(x), Date(y)) => Ok(x.cmp(y)),
        (Bool(x), Bool(y)) => Ok(x.cmp(y)),
        _ => Err(incompatible(a, op, b)),
    }
}

pub(crate) fn incompatible(a: &Scalar, op: &'static str, b: &Scalar) -> TypeError {
    TypeError::Incompatible {
        left: a.type_name(),
        op,
        right: b.type_name(),
    }
}

fn cmp_f64(x: f64, y: f64) -> Ordering {
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

/// Parse a finite decimal number.
pub fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse `YYYY-MM-DD`, also accepting an RFC 3339 timestamp's date part.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let head = match s.as_bytes().get(10) {
        Some(b'T') | Some(b' ') => s.get(..10)?,
        _ => s,
    };
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
}

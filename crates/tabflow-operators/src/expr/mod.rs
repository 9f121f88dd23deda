//! Formula expressions: `{price} * {qty} - 5`, `{end} - {start}`, `{a} >= 10`.
//!
//! Text is tokenized, parsed once into an [`Expr`] tree when the stage is
//! built, then evaluated per row. Parse errors are configuration errors;
//! evaluation problems are per-row nulls with an [`Evaluated::issue`].

mod eval;
mod lexer;
mod parser;

use std::fmt;

use tabflow_core::arith::ArithOp;
use tabflow_core::types::{CompareOp, Scalar};
use thiserror::Error;

pub use eval::{evaluate, Evaluated};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Scalar),
    Column(String),
    Neg(Box<Expr>),
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Parse formula text into an expression tree.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = lexer::tokenize(source)?;
    parser::Parser::new(&tokens, source.len()).parse()
}

impl Expr {
    /// Column names referenced anywhere in the expression, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Column(c) => {
                if !out.contains(&c.as_str()) {
                    out.push(c);
                }
            }
            Expr::Neg(inner) => inner.collect_columns(out),
            Expr::Arith { left, right, .. } | Expr::Compare { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Scalar::Text(s)) => write!(f, "{s:?}"),
            Expr::Literal(Scalar::Null) => f.write_str("null"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Column(c) => write!(f, "{{{c}}}"),
            Expr::Neg(inner) => write!(f, "-({inner})"),
            Expr::Arith { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Compare { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
        }
    }
}

//! Recursive descent over the token stream.
//!
//! ```text
//! expr    := sum (cmp sum)?
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary)*
//! unary   := '-' unary | atom
//! atom    := number | string | {column} | true | false | null | '(' expr ')'
//! ```

use tabflow_core::arith::ArithOp;
use tabflow_core::types::Scalar;

use super::lexer::{Spanned, Token};
use super::{Expr, ParseError};

pub(crate) struct Parser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
    end: usize,
}

impl<'t> Parser<'t> {
    pub(crate) fn new(tokens: &'t [Spanned], end: usize) -> Self {
        Self { tokens, pos: 0, end }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::new(0, "empty expression"));
        }
        let expr = self.expr()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some((tok, off)) => Err(ParseError::new(*off, format!("unexpected {}", describe(tok)))),
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, o)| *o).unwrap_or(self.end)
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let left = self.sum()?;
        if let Some(Token::Cmp(op)) = self.peek() {
            self.pos += 1;
            let right = self.sum()?;
            if let Some(Token::Cmp(_)) = self.peek() {
                return Err(ParseError::new(self.offset(), "comparisons cannot be chained"));
            }
            return Ok(Expr::Compare {
                op: *op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn sum(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.product()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn product(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if let Some(Token::Minus) = self.peek() {
            self.pos += 1;
            let inner = self.unary()?;
            return Ok(match inner {
                Expr::Literal(Scalar::Number(v)) => Expr::Literal(Scalar::Number(-v)),
                other => Expr::Neg(Box::new(other)),
            });
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        let Some(tok) = self.peek() else {
            return Err(ParseError::new(offset, "unexpected end of expression"));
        };
        self.pos += 1;
        match tok {
            Token::Number(v) => Ok(Expr::Literal(Scalar::Number(*v))),
            Token::Str(s) => Ok(Expr::Literal(Scalar::Text(s.clone()))),
            Token::Column(c) => Ok(Expr::Column(c.clone())),
            Token::Ident(id) => match id.to_ascii_lowercase().as_str() {
                "true" => Ok(Expr::Literal(Scalar::Bool(true))),
                "false" => Ok(Expr::Literal(Scalar::Bool(false))),
                "null" => Ok(Expr::Literal(Scalar::Null)),
                _ => Err(ParseError::new(
                    offset,
                    format!("unknown identifier '{id}' (columns are written as {{{id}}})"),
                )),
            },
            Token::LParen => {
                let inner = self.expr()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(ParseError::new(self.offset(), "expected ')'")),
                }
            }
            other => Err(ParseError::new(offset, format!("unexpected {}", describe(other)))),
        }
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Number(v) => format!("number {v}"),
        Token::Str(s) => format!("string {s:?}"),
        Token::Column(c) => format!("column {{{c}}}"),
        Token::Ident(id) => format!("identifier '{id}'"),
        Token::Plus => "'+'".into(),
        Token::Minus => "'-'".into(),
        Token::Star => "'*'".into(),
        Token::Slash => "'/'".into(),
        Token::LParen => "'('".into(),
        Token::RParen => "')'".into(),
        Token::Cmp(op) => format!("'{}'", op.symbol()),
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::parse;

    fn shape(src: &str) -> String {
        parse(src).unwrap().to_string()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(shape("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(shape("10 - 4 - 3"), "((10 - 4) - 3)");
        assert_eq!(shape("({a} + {b}) / 2"), "(({a} + {b}) / 2)");
    }

    #[test]
    fn comparison_binds_loosest() {
        assert_eq!(shape("{a} * 2 >= {b} + 1"), "(({a} * 2) >= ({b} + 1))");
    }

    #[test]
    fn unary_minus() {
        assert_eq!(shape("-3"), "-3");
        assert_eq!(shape("-{a} * 2"), "(-({a}) * 2)");
    }

    #[test]
    fn literals() {
        assert_eq!(shape("'EUR'"), "\"EUR\"");
        assert_eq!(shape("TRUE"), "true");
        assert_eq!(shape("null"), "null");
    }

    #[test]
    fn malformed_inputs() {
        for bad in ["", "1 +", "(1 + 2", "1 2", "price * 2", "{a} == {b} == {c}", "* 3"] {
            assert!(parse(bad).is_err(), "expected parse error for {bad:?}");
        }
    }
}

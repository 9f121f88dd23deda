use tabflow_core::types::{parse_number, CompareOp};

use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Column(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Cmp(CompareOp),
}

/// A token and the byte offset it starts at.
pub(crate) type Spanned = (Token, usize);

pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => out.push((Token::Plus, start)),
            b'-' => out.push((Token::Minus, start)),
            b'*' => out.push((Token::Star, start)),
            b'/' => out.push((Token::Slash, start)),
            b'(' => out.push((Token::LParen, start)),
            b')' => out.push((Token::RParen, start)),
            b'=' | b'!' | b'<' | b'>' => {
                let next = bytes.get(i + 1).copied();
                let (op, width) = match (c, next) {
                    (b'=', Some(b'=')) => (CompareOp::Eq, 2),
                    (b'!', Some(b'=')) => (CompareOp::Ne, 2),
                    (b'<', Some(b'=')) => (CompareOp::Le, 2),
                    (b'>', Some(b'=')) => (CompareOp::Ge, 2),
                    (b'<', _) => (CompareOp::Lt, 1),
                    (b'>', _) => (CompareOp::Gt, 1),
                    _ => return Err(ParseError::new(start, format!("unexpected '{}'", c as char))),
                };
                out.push((Token::Cmp(op), start));
                i += width;
                continue;
            }
            b'{' => {
                let close = src[start + 1..]
                    .find('}')
                    .ok_or_else(|| ParseError::new(start, "unterminated column reference"))?;
                let name = src[start + 1..start + 1 + close].trim();
                if name.is_empty() {
                    return Err(ParseError::new(start, "empty column reference"));
                }
                out.push((Token::Column(name.to_string()), start));
                i = start + close + 2;
                continue;
            }
            b'"' | b'\'' => {
                let (text, end) = read_string(src, start, c)?;
                out.push((Token::Str(text), start));
                i = end;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                let mut end = i;
                while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
                    end += 1;
                }
                end = exponent_end(bytes, end);
                let raw = &src[start..end];
                let value = parse_number(raw)
                    .ok_or_else(|| ParseError::new(start, format!("invalid number '{raw}'")))?;
                out.push((Token::Number(value), start));
                i = end;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut end = i;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                    end += 1;
                }
                out.push((Token::Ident(src[start..end].to_string()), start));
                i = end;
                continue;
            }
            _ => {
                let ch = src[start..].chars().next().unwrap_or('?');
                return Err(ParseError::new(start, format!("unexpected character '{ch}'")));
            }
        }
        i += 1;
    }
    Ok(out)
}

/// End of an `[eE][+-]?digits` suffix at `at`, or `at` when there is none.
fn exponent_end(bytes: &[u8], at: usize) -> usize {
    if !matches!(bytes.get(at), Some(b'e' | b'E')) {
        return at;
    }
    let mut end = at + 1;
    if matches!(bytes.get(end), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits = bytes[end..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        at
    } else {
        end + digits
    }
}

/// Read a quoted string starting at `start`; returns the text and the offset past the closing quote.
fn read_string(src: &str, start: usize, quote: u8) -> Result<(String, usize), ParseError> {
    let mut text = String::new();
    let mut chars = src[start + 1..].char_indices();
    while let Some((off, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, esc)) => text.push(esc),
                None => break,
            },
            c if c as u32 == quote as u32 => return Ok((text, start + 1 + off + 1)),
            c => text.push(c),
        }
    }
    Err(ParseError::new(start, "unterminated string literal"))
}

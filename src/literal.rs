//! Lenient decoder for "JSON-ish" structural literals.
//!
//! Models asked for JSON regularly answer with something closer to a Python literal:
//! single-quoted strings, `True`/`False`/`None`, trailing commas, tuples, bare keys.
//! This decoder accepts that superset and produces a `serde_json::Value`, preserving
//! mapping insertion order.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
  pub offset: usize,
  pub message: String,
}

/// Decode a complete literal. Trailing non-whitespace is an error.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
  let mut p = Parser { src: input, pos: 0 };
  let value = p.value(0)?;
  p.skip_ws();
  if p.pos < p.src.len() {
    return Err(p.error("unexpected trailing characters"));
  }
  Ok(value)
}

const MAX_DEPTH: usize = 128;

struct Parser<'a> {
  src: &'a str,
  pos: usize,
}

impl<'a> Parser<'a> {
  fn error(&self, message: impl Into<String>) -> LiteralError {
    LiteralError { offset: self.pos, message: message.into() }
  }

  fn peek(&self) -> Option<char> {
    self.src[self.pos..].chars().next()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += c.len_utf8();
    Some(c)
  }

  fn skip_ws(&mut self) {
    loop {
      match self.peek() {
        Some(c) if c.is_whitespace() => { self.bump(); }
        // Python-style line comment
        Some('#') => {
          while let Some(c) = self.bump() {
            if c == '\n' { break; }
          }
        }
        _ => break,
      }
    }
  }

  fn value(&mut self, depth: usize) -> Result<Value, LiteralError> {
    if depth > MAX_DEPTH {
      return Err(self.error("nesting too deep"));
    }
    self.skip_ws();
    match self.peek() {
      Some('{') => self.mapping(depth),
      Some('[') => self.sequence(depth, ']'),
      Some('(') => self.sequence(depth, ')'),
      Some(q @ ('"' | '\'')) => self.string(q).map(Value::String),
      Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
      Some(c) if is_ident_start(c) => {
        let word = self.ident();
        match word {
          "True" | "true" => Ok(Value::Bool(true)),
          "False" | "false" => Ok(Value::Bool(false)),
          "None" | "null" => Ok(Value::Null),
          other => Err(self.error(format!("unexpected identifier `{}`", other))),
        }
      }
      Some(c) => Err(self.error(format!("unexpected character `{}`", c))),
      None => Err(self.error("unexpected end of input")),
    }
  }

  fn mapping(&mut self, depth: usize) -> Result<Value, LiteralError> {
    self.bump(); // {
    let mut map = Map::new();
    loop {
      self.skip_ws();
      match self.peek() {
        Some('}') => { self.bump(); return Ok(Value::Object(map)); }
        None => return Err(self.error("unterminated mapping")),
        _ => {}
      }
      let key = self.key()?;
      self.skip_ws();
      match self.bump() {
        Some(':') => {}
        _ => return Err(self.error("expected `:` after mapping key")),
      }
      let value = self.value(depth + 1)?;
      map.insert(key, value);
      self.skip_ws();
      match self.peek() {
        Some(',') => { self.bump(); }
        Some('}') => {}
        _ => return Err(self.error("expected `,` or `}` in mapping")),
      }
    }
  }

  fn key(&mut self) -> Result<String, LiteralError> {
    match self.peek() {
      Some(q @ ('"' | '\'')) => self.string(q),
      Some(c) if c == '-' || c.is_ascii_digit() => {
        // Numeric keys (`{1: {...}}`) become their decimal text.
        match self.number()? {
          Value::Number(n) => Ok(n.to_string()),
          _ => Err(self.error("invalid numeric key")),
        }
      }
      Some(c) if is_ident_start(c) => Ok(self.ident().to_string()),
      _ => Err(self.error("expected mapping key")),
    }
  }

  fn sequence(&mut self, depth: usize, close: char) -> Result<Value, LiteralError> {
    self.bump(); // [ or (
    let mut items = Vec::new();
    loop {
      self.skip_ws();
      if self.peek() == Some(close) {
        self.bump();
        return Ok(Value::Array(items));
      }
      if self.peek().is_none() {
        return Err(self.error("unterminated sequence"));
      }
      items.push(self.value(depth + 1)?);
      self.skip_ws();
      match self.peek() {
        Some(',') => { self.bump(); }
        Some(c) if c == close => {}
        _ => return Err(self.error(format!("expected `,` or `{}` in sequence", close))),
      }
    }
  }

  fn string(&mut self, quote: char) -> Result<String, LiteralError> {
    self.bump(); // opening quote
    let mut out = String::new();
    loop {
      match self.bump() {
        None => return Err(self.error("unterminated string")),
        Some(c) if c == quote => return Ok(out),
        Some('\\') => {
          let esc = self.bump().ok_or_else(|| self.error("unterminated escape"))?;
          match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            '0' => out.push('\0'),
            '\n' => {} // line continuation
            'u' => out.push(self.utf16_escape()?),
            'x' => out.push(self.unicode_escape(2)?),
            other => out.push(other), // \\ \' \" \/ and anything unknown
          }
        }
        Some(c) => out.push(c),
      }
    }
  }

  fn hex_code(&mut self, digits: usize) -> Result<u32, LiteralError> {
    let end = self.pos + digits;
    let hex = self.src.get(self.pos..end).ok_or_else(|| self.error("truncated escape"))?;
    let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
    self.pos = end;
    Ok(code)
  }

  fn unicode_escape(&mut self, digits: usize) -> Result<char, LiteralError> {
    let code = self.hex_code(digits)?;
    Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
  }

  /// `\uXXXX`, joining a high surrogate with an immediately following `\uDC00`-`\uDFFF`.
  /// A lone surrogate becomes U+FFFD.
  fn utf16_escape(&mut self) -> Result<char, LiteralError> {
    let high = self.hex_code(4)?;
    if !(0xD800..=0xDBFF).contains(&high) {
      return Ok(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    let low = self.src
      .get(self.pos..self.pos + 6)
      .and_then(|s| s.strip_prefix("\\u"))
      .and_then(|hex| u32::from_str_radix(hex, 16).ok())
      .filter(|low| (0xDC00..=0xDFFF).contains(low));
    match low {
      Some(low) => {
        self.pos += 6;
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
      }
      None => Ok(char::REPLACEMENT_CHARACTER),
    }
  }

  fn number(&mut self) -> Result<Value, LiteralError> {
    let start = self.pos;
    while let Some(c) = self.peek() {
      if c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_') {
        self.bump();
      } else {
        break;
      }
    }
    let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
    let text = text.strip_prefix('+').unwrap_or(&text);
    if let Ok(i) = text.parse::<i64>() {
      return Ok(Value::Number(i.into()));
    }
    match text.parse::<f64>().ok().and_then(Number::from_f64) {
      Some(n) => Ok(Value::Number(n)),
      None => {
        self.pos = start;
        Err(self.error(format!("invalid number `{}`", text)))
      }
    }
  }

  fn ident(&mut self) -> &'a str {
    let start = self.pos;
    while let Some(c) = self.peek() {
      if c.is_alphanumeric() || c == '_' { self.bump(); } else { break; }
    }
    &self.src[start..self.pos]
  }
}

fn is_ident_start(c: char) -> bool {
  c.is_alphabetic() || c == '_'
}

//! Tokenizer and parser for ISO 10303-21 (STEP physical file) text.
//!
//! The parser is schema-agnostic: it produces untyped [`Entity`] records and
//! leaves attribute interpretation to the caller.

use super::value::{Entity, EntityId, Value};
use crate::error::{Bim2GraphError, Result};
use std::collections::HashSet;

/// Contents of the HEADER section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    /// `FILE_DESCRIPTION` description strings.
    pub description: Vec<String>,
    /// `FILE_NAME` name.
    pub file_name: Option<String>,
    /// `FILE_NAME` time stamp.
    pub timestamp: Option<String>,
    /// `FILE_NAME` originating system.
    pub originating_system: Option<String>,
    /// `FILE_SCHEMA` identifiers, e.g. `["IFC4"]`.
    pub schema_identifiers: Vec<String>,
}

/// A fully parsed file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub header: Header,
    pub entities: Vec<Entity>,
}

/// Parse STEP physical file text. A leading byte-order mark is ignored.
pub fn parse(text: &str) -> Result<ParsedFile> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    Parser::new(text).parse_file()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Keyword(String),
    Ref(u64),
    Integer(i64),
    Real(f64),
    String(String),
    Enum(String),
    Binary(String),
    Dollar,
    Star,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Equals,
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> Bim2GraphError {
        Bim2GraphError::parse(self.line, message)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    let start_line = self.line;
                    let body = &self.text[self.pos + 2..];
                    let end = body.find("*/").ok_or_else(|| {
                        Bim2GraphError::parse(start_line, "unterminated comment")
                    })?;
                    self.line += body[..end].matches('\n').count();
                    self.pos += 2 + end + 2;
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Next token with the line it starts on.
    fn next_token(&mut self) -> Result<Option<(Token, usize)>> {
        self.skip_trivia()?;
        let Some(&byte) = self.bytes.get(self.pos) else {
            return Ok(None);
        };
        let line = self.line;

        let token = match byte {
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'=' => self.single(Token::Equals),
            b'$' => self.single(Token::Dollar),
            b'*' => self.single(Token::Star),
            b'#' => self.entity_ref()?,
            b'\'' => self.string()?,
            b'"' => self.binary()?,
            b'.' => self.enumeration()?,
            b'0'..=b'9' | b'+' | b'-' => self.number()?,
            b if b.is_ascii_alphabetic() || b == b'_' => self.keyword(),
            _ => {
                let ch = self.text[self.pos..].chars().next().unwrap_or('?');
                return Err(self.error(format!("unexpected character '{}'", ch)));
            }
        };

        Ok(Some((token, line)))
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let text = self.text;
        let start = self.pos;
        while self.pos < self.bytes.len() && pred(self.bytes[self.pos]) {
            self.pos += 1;
        }
        &text[start..self.pos]
    }

    fn entity_ref(&mut self) -> Result<Token> {
        self.pos += 1;
        let digits = self.take_while(|b| b.is_ascii_digit());
        digits
            .parse()
            .map(Token::Ref)
            .map_err(|_| self.error("expected instance number after '#'"))
    }

    fn string(&mut self) -> Result<Token> {
        let text = self.text;
        let start_line = self.line;
        self.pos += 1;
        let mut raw = String::new();
        loop {
            let rest = &text[self.pos..];
            let end = rest
                .find('\'')
                .ok_or_else(|| Bim2GraphError::parse(start_line, "unterminated string"))?;
            raw.push_str(&rest[..end]);
            self.line += rest[..end].matches('\n').count();
            self.pos += end + 1;
            if self.bytes.get(self.pos) == Some(&b'\'') {
                raw.push('\'');
                self.pos += 1;
            } else {
                break;
            }
        }
        decode_string(&raw)
            .map(Token::String)
            .map_err(|message| Bim2GraphError::parse(start_line, message))
    }

    fn binary(&mut self) -> Result<Token> {
        self.pos += 1;
        let body = self.take_while(|b| b != b'"');
        if self.bytes.get(self.pos) != Some(&b'"') {
            return Err(self.error("unterminated binary literal"));
        }
        self.pos += 1;
        Ok(Token::Binary(body.to_string()))
    }

    fn enumeration(&mut self) -> Result<Token> {
        self.pos += 1;
        let name = self.take_while(|b| b.is_ascii_alphanumeric() || b == b'_');
        if self.bytes.get(self.pos) != Some(&b'.') || name.is_empty() {
            return Err(self.error("malformed enumeration literal"));
        }
        self.pos += 1;
        Ok(Token::Enum(name.to_ascii_uppercase()))
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.pos;
        self.pos += 1;
        while let Some(&b) = self.bytes.get(self.pos) {
            let prev = self.bytes[self.pos - 1];
            let sign_after_exponent = (b == b'+' || b == b'-') && (prev == b'E' || prev == b'e');
            if b.is_ascii_digit() || b == b'.' || b == b'E' || b == b'e' || sign_after_exponent {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.text;
        let literal = &text[start..self.pos];
        let is_real = literal.contains(['.', 'E', 'e']);
        let token = if is_real {
            literal.parse().map(Token::Real).ok()
        } else {
            literal.parse().map(Token::Integer).ok()
        };
        token.ok_or_else(|| self.error(format!("invalid number '{}'", literal)))
    }

    fn keyword(&mut self) -> Token {
        let word = self.take_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        Token::Keyword(word.to_ascii_uppercase())
    }
}

/// Decode the Part 21 control directives inside a string literal.
///
/// Handles `\\`, `\S\c`, `\X\hh`, `\X2\...\X0\` and `\X4\...\X0\`; code page
/// switches (`\PA\`) are dropped.
fn decode_string(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(idx) = rest.find('\\') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];

        if let Some(tail) = rest.strip_prefix("\\\\") {
            out.push('\\');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("\\X2\\") {
            let end = tail.find("\\X0\\").ok_or("unterminated \\X2\\ directive")?;
            let hex = &tail[..end];
            if !hex.is_ascii() || hex.len() % 4 != 0 {
                return Err(format!("malformed \\X2\\ directive '{}'", hex));
            }
            let units = (0..hex.len())
                .step_by(4)
                .map(|i| u16::from_str_radix(&hex[i..i + 4], 16))
                .collect::<std::result::Result<Vec<u16>, _>>()
                .map_err(|_| format!("malformed \\X2\\ directive '{}'", hex))?;
            let decoded = String::from_utf16(&units)
                .map_err(|_| format!("invalid UTF-16 in \\X2\\ directive '{}'", hex))?;
            out.push_str(&decoded);
            rest = &tail[end + 4..];
        } else if let Some(tail) = rest.strip_prefix("\\X4\\") {
            let end = tail.find("\\X0\\").ok_or("unterminated \\X4\\ directive")?;
            let hex = &tail[..end];
            if !hex.is_ascii() || hex.len() % 8 != 0 {
                return Err(format!("malformed \\X4\\ directive '{}'", hex));
            }
            for i in (0..hex.len()).step_by(8) {
                let ch = u32::from_str_radix(&hex[i..i + 8], 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("malformed \\X4\\ directive '{}'", hex))?;
                out.push(ch);
            }
            rest = &tail[end + 4..];
        } else if let Some(tail) = rest.strip_prefix("\\X\\") {
            let byte = tail
                .get(..2)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or("malformed \\X\\ directive")?;
            out.push(char::from(byte));
            rest = &tail[2..];
        } else if let Some(tail) = rest.strip_prefix("\\S\\") {
            let ch = tail.chars().next().ok_or("malformed \\S\\ directive")?;
            let shifted = char::from_u32(ch as u32 + 128).ok_or("malformed \\S\\ directive")?;
            out.push(shifted);
            rest = &tail[ch.len_utf8()..];
        } else if rest.starts_with("\\P") && rest.get(3..4) == Some("\\") {
            rest = &rest[4..];
        } else {
            out.push('\\');
            rest = &rest[1..];
        }
    }

    out.push_str(rest);
    Ok(out)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<(Token, usize)>,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lexer: Lexer::new(text),
            peeked: None,
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> Bim2GraphError {
        Bim2GraphError::parse(self.line, message)
    }

    fn peek(&mut self) -> Result<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next_token()?;
        }
        Ok(self.peeked.as_ref().map(|(token, _)| token))
    }

    fn bump(&mut self) -> Result<Option<Token>> {
        let next = match self.peeked.take() {
            Some(next) => Some(next),
            None => self.lexer.next_token()?,
        };
        Ok(next.map(|(token, line)| {
            self.line = line;
            token
        }))
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.bump()? {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {:?}, found {:?}", expected, token))),
            None => Err(self.error(format!("expected {:?}, found end of file", expected))),
        }
    }

    fn parse_file(mut self) -> Result<ParsedFile> {
        let mut file = ParsedFile::default();

        while let Some(token) = self.bump()? {
            match token {
                Token::Keyword(k) if k == "ISO-10303-21" => self.expect(Token::Semicolon)?,
                Token::Keyword(k) if k == "HEADER" => {
                    self.expect(Token::Semicolon)?;
                    self.parse_header(&mut file.header)?;
                }
                Token::Keyword(k) if k == "DATA" => {
                    if self.peek()? == Some(&Token::LParen) {
                        self.parse_value()?;
                    }
                    self.expect(Token::Semicolon)?;
                    self.parse_data(&mut file.entities)?;
                }
                Token::Keyword(k) if k == "END-ISO-10303-21" => {
                    self.expect(Token::Semicolon)?;
                    break;
                }
                other => {
                    return Err(self.error(format!("unexpected {:?} outside of a section", other)))
                }
            }
        }

        Ok(file)
    }

    fn parse_header(&mut self, header: &mut Header) -> Result<()> {
        loop {
            match self.bump()? {
                Some(Token::Keyword(k)) if k == "ENDSEC" => return self.expect(Token::Semicolon),
                Some(Token::Keyword(name)) => {
                    self.expect(Token::LParen)?;
                    let args = self.parse_args()?;
                    self.expect(Token::Semicolon)?;
                    apply_header_record(header, &name, &args);
                }
                Some(other) => {
                    return Err(self.error(format!("unexpected {:?} in HEADER section", other)))
                }
                None => return Err(self.error("unterminated HEADER section")),
            }
        }
    }

    fn parse_data(&mut self, entities: &mut Vec<Entity>) -> Result<()> {
        let mut seen = HashSet::new();
        loop {
            match self.bump()? {
                Some(Token::Keyword(k)) if k == "ENDSEC" => return self.expect(Token::Semicolon),
                Some(Token::Ref(n)) => {
                    let id = EntityId(n);
                    if !seen.insert(id) {
                        return Err(self.error(format!("duplicate instance {}", id)));
                    }
                    self.expect(Token::Equals)?;
                    let entity = self.parse_instance(id)?;
                    self.expect(Token::Semicolon)?;
                    entities.push(entity);
                }
                Some(other) => {
                    return Err(self.error(format!("unexpected {:?} in DATA section", other)))
                }
                None => return Err(self.error("unterminated DATA section")),
            }
        }
    }

    /// Simple (`IFCWALL(...)`) or complex (`(IFCA(...) IFCB(...))`) instance.
    fn parse_instance(&mut self, id: EntityId) -> Result<Entity> {
        match self.bump()? {
            Some(Token::Keyword(class)) => {
                self.expect(Token::LParen)?;
                let attributes = self.parse_args()?;
                Ok(Entity {
                    id,
                    class,
                    attributes,
                })
            }
            Some(Token::LParen) => {
                let mut class = None;
                let mut attributes = Vec::new();
                while let Some(Token::Keyword(_)) = self.peek()? {
                    if let Some(Token::Keyword(part)) = self.bump()? {
                        class.get_or_insert(part);
                    }
                    self.expect(Token::LParen)?;
                    attributes.extend(self.parse_args()?);
                }
                self.expect(Token::RParen)?;
                let class = class.ok_or_else(|| self.error(format!("empty complex instance {}", id)))?;
                Ok(Entity {
                    id,
                    class,
                    attributes,
                })
            }
            Some(other) => Err(self.error(format!("expected entity type for {}, found {:?}", id, other))),
            None => Err(self.error(format!("unterminated instance {}", id))),
        }
    }

    /// Comma separated values up to the closing parenthesis; `(` already consumed.
    fn parse_args(&mut self) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        if self.peek()? == Some(&Token::RParen) {
            self.bump()?;
            return Ok(values);
        }
        loop {
            values.push(self.parse_value()?);
            match self.bump()? {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(values),
                Some(other) => {
                    return Err(self.error(format!("expected ',' or ')', found {:?}", other)))
                }
                None => return Err(self.error("unterminated parameter list")),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        let value = match self.bump()? {
            Some(Token::Dollar) => Value::Null,
            Some(Token::Star) => Value::Derived,
            Some(Token::Integer(i)) => Value::Integer(i),
            Some(Token::Real(r)) => Value::Real(r),
            Some(Token::String(s)) => Value::String(s),
            Some(Token::Enum(e)) => Value::Enum(e),
            Some(Token::Binary(b)) => Value::Binary(b),
            Some(Token::Ref(n)) => Value::Ref(EntityId(n)),
            Some(Token::LParen) => Value::List(self.parse_args()?),
            Some(Token::Keyword(type_name)) => {
                self.expect(Token::LParen)?;
                let mut args = self.parse_args()?;
                let value = if args.len() == 1 {
                    args.remove(0)
                } else {
                    Value::List(args)
                };
                Value::Typed {
                    type_name,
                    value: Box::new(value),
                }
            }
            Some(other) => return Err(self.error(format!("unexpected {:?} in parameter list", other))),
            None => return Err(self.error("unexpected end of file in parameter list")),
        };
        Ok(value)
    }
}

fn apply_header_record(header: &mut Header, name: &str, args: &[Value]) {
    let strings = |value: Option<&Value>| -> Vec<String> {
        value
            .and_then(Value::as_list)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };
    let string = |index: usize| args.get(index).and_then(Value::as_str).map(str::to_string);

    match name {
        "FILE_DESCRIPTION" => header.description = strings(args.first()),
        "FILE_NAME" => {
            header.file_name = string(0);
            header.timestamp = string(1);
            header.originating_system = string(5);
        }
        "FILE_SCHEMA" => header.schema_identifiers = strings(args.first()),
        _ => {}
    }
}

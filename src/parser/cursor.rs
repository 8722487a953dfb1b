//! A position-tracking reader over the parser's input text.
//!
//! [`Cursor`] hands out characters with XML line-end normalization, keeps
//! the line and column for diagnostics, and enforces the nesting-depth and
//! name-length limits. Only the five predefined entities and character
//! references are resolved; nothing external is ever loaded.

use crate::error::{ParseError, SourceLocation};

use super::chars::{is_name_char, is_name_start_char, is_space, is_xml_char};

/// Limits the cursor itself enforces.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limits {
    pub max_depth: u32,
    pub max_name_length: usize,
}

pub(crate) struct Cursor<'a> {
    src: &'a str,
    /// Byte offset; always on a char boundary.
    pos: usize,
    line: u32,
    column: u32,
    depth: u32,
    limits: Limits,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str, limits: Limits) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            limits,
        }
    }

    // -- Diagnostics --

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    /// A `ParseError` at the current position.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.location())
    }

    // -- Looking ahead --

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Fails if the next character is not allowed anywhere in XML.
    pub fn check_char(&self) -> Result<(), ParseError> {
        match self.peek_char() {
            Some(c) if !is_xml_char(c) => {
                Err(self.error(format!("invalid XML character: U+{:04X}", c as u32)))
            }
            _ => Ok(()),
        }
    }

    pub fn starts_with(&self, lit: &str) -> bool {
        self.rest().starts_with(lit)
    }

    // -- Consuming --

    fn step(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += c.len_utf8();
    }

    /// Consumes `lit` if the input starts with it.
    pub fn eat(&mut self, lit: &str) -> bool {
        if !self.starts_with(lit) {
            return false;
        }
        for c in lit.chars() {
            self.step(c);
        }
        true
    }

    /// Consumes `lit` or fails naming what was found instead.
    pub fn expect(&mut self, lit: &str) -> Result<(), ParseError> {
        if self.eat(lit) {
            return Ok(());
        }
        let found = match self.peek_char() {
            Some(c) => format!("'{c}'"),
            None => "end of input".to_string(),
        };
        Err(self.error(format!("expected '{lit}', found {found}")))
    }

    /// Consumes one character. `\r\n` and a lone `\r` both read as `\n`
    /// (XML 1.0 §2.11); characters outside `Char` are an error.
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let c = self
            .peek_char()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.check_char()?;
        self.step(c);
        if c == '\r' {
            self.eat("\n");
            return Ok('\n');
        }
        Ok(c)
    }

    /// Reads characters up to and including `end`, returning what came
    /// before it.
    pub fn text_until(&mut self, end: &str, what: &str) -> Result<String, ParseError> {
        let mut text = String::new();
        while !self.eat(end) {
            if self.is_eof() {
                return Err(self.error(format!("unexpected end of input in {what}")));
            }
            text.push(self.next_char()?);
        }
        Ok(text)
    }

    // -- Whitespace --

    /// Consumes whitespace and returns it untouched.
    pub fn take_space(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_space) {
            self.step(char::from(self.src.as_bytes()[self.pos]));
        }
        &self.src[start..self.pos]
    }

    /// Consumes whitespace; `true` if there was any.
    pub fn skip_space(&mut self) -> bool {
        !self.take_space().is_empty()
    }

    pub fn require_space(&mut self, before: &str) -> Result<(), ParseError> {
        if self.skip_space() {
            Ok(())
        } else {
            Err(self.error(format!("whitespace required before {before}")))
        }
    }

    // -- Nesting --

    pub fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(self.error(format!(
                "maximum nesting depth exceeded ({})",
                self.limits.max_depth
            )));
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -- Lexical productions --

    /// `Name` (XML 1.0 `[5]`).
    pub fn name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        match self.peek_char() {
            Some(c) if is_name_start_char(c) => self.step(c),
            Some(c) => return Err(self.error(format!("invalid name start character: '{c}'"))),
            None => return Err(self.error("expected name, found end of input")),
        }
        while let Some(c) = self.peek_char().filter(|&c| is_name_char(c)) {
            self.step(c);
        }
        let len = self.pos - start;
        if len > self.limits.max_name_length {
            return Err(self.error(format!(
                "name length ({len}) exceeds maximum ({})",
                self.limits.max_name_length
            )));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    /// An entity or character reference (XML 1.0 §4.1), starting at `&`.
    pub fn reference(&mut self) -> Result<char, ParseError> {
        self.expect("&")?;
        if !self.eat("#") {
            let name = self.name()?;
            self.expect(";")?;
            return match name.as_str() {
                "lt" => Ok('<'),
                "gt" => Ok('>'),
                "amp" => Ok('&'),
                "apos" => Ok('\''),
                "quot" => Ok('"'),
                _ => Err(self.error(format!("undefined entity: &{name};"))),
            };
        }

        let radix = if self.eat("x") { 16 } else { 10 };
        let digits = self
            .rest()
            .bytes()
            .take_while(|b| if radix == 16 { b.is_ascii_hexdigit() } else { b.is_ascii_digit() })
            .count();
        let literal = &self.rest()[..digits];
        if literal.is_empty() {
            return Err(self.error("empty character reference"));
        }
        let value = u32::from_str_radix(literal, radix)
            .map_err(|_| self.error("character reference out of range"))?;
        self.eat(literal);
        self.expect(";")?;

        char::from_u32(value).filter(|&c| is_xml_char(c)).ok_or_else(|| {
            self.error(format!(
                "character reference &#x{value:X}; does not refer to a valid XML character"
            ))
        })
    }

    /// A quoted attribute value (XML 1.0 §3.3.3): references resolved,
    /// literal tabs and newlines read as spaces.
    pub fn attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = self.quote()?;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unexpected end of input in attribute value")),
                Some(b) if b == quote => {
                    self.pos += 1;
                    self.column += 1;
                    return Ok(value);
                }
                Some(b'&') => value.push(self.reference()?),
                Some(b'<') => return Err(self.error("'<' not allowed in attribute values")),
                Some(_) => match self.next_char()? {
                    '\n' | '\t' => value.push(' '),
                    c => value.push(c),
                },
            }
        }
    }

    /// A quoted literal taken verbatim, without reference resolution.
    pub fn literal(&mut self) -> Result<&'a str, ParseError> {
        let quote = self.quote()?;
        let len = self
            .rest()
            .bytes()
            .position(|b| b == quote)
            .ok_or_else(|| self.error("unterminated quoted literal"))?;
        let text = &self.rest()[..len];
        for c in text.chars() {
            self.step(c);
        }
        self.pos += 1;
        self.column += 1;
        Ok(text)
    }

    fn quote(&mut self) -> Result<u8, ParseError> {
        match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                self.pos += 1;
                self.column += 1;
                Ok(q)
            }
            _ => Err(self.error("expected a quoted value")),
        }
    }
}

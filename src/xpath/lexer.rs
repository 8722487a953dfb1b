//! Path expression tokenizer.
//!
//! Converts an expression string into [`Spanned`] tokens, each carrying the
//! byte offset it started at so the parser can report precise positions.
//!
//! # Disambiguation
//!
//! Names are lexed generically and then classified in a second pass:
//!
//! - `and` / `or` directly after something that ends an operand are
//!   operators, otherwise they are element names.
//! - A name followed by `(` is a node type test or a function name.
//! - A name followed by `::` is an axis name.

use super::PathError;

const NODE_TYPE_NAMES: &[&str] = &["comment", "text", "processing-instruction", "node"];

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `@`
    At,
    /// `,`
    Comma,
    /// `::`
    ColonColon,
    /// `/`
    Slash,
    /// `//`
    DoubleSlash,
    /// `|`
    Pipe,
    /// `*` as a name test.
    Star,
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// The `and` operator.
    And,
    /// The `or` operator.
    Or,
    /// A quoted string literal, quotes removed.
    Literal(String),
    /// A numeric literal.
    Number(f64),
    /// A name test (possibly a prefixed `QName`).
    Name(String),
    /// `comment`, `text`, `processing-instruction` or `node` before `(`.
    NodeType(String),
    /// Any other name before `(`.
    FunctionName(String),
    /// A name before `::`.
    AxisName(String),
}

impl Token {
    /// Short description used in parse error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::LeftParen => "'('".to_string(),
            Self::RightParen => "')'".to_string(),
            Self::LeftBracket => "'['".to_string(),
            Self::RightBracket => "']'".to_string(),
            Self::Dot => "'.'".to_string(),
            Self::DotDot => "'..'".to_string(),
            Self::At => "'@'".to_string(),
            Self::Comma => "','".to_string(),
            Self::ColonColon => "'::'".to_string(),
            Self::Slash => "'/'".to_string(),
            Self::DoubleSlash => "'//'".to_string(),
            Self::Pipe => "'|'".to_string(),
            Self::Star => "'*'".to_string(),
            Self::Eq => "'='".to_string(),
            Self::Neq => "'!='".to_string(),
            Self::Lt => "'<'".to_string(),
            Self::Lte => "'<='".to_string(),
            Self::Gt => "'>'".to_string(),
            Self::Gte => "'>='".to_string(),
            Self::And => "'and'".to_string(),
            Self::Or => "'or'".to_string(),
            Self::Literal(s) => format!("literal '{s}'"),
            Self::Number(n) => format!("number {n}"),
            Self::Name(n) | Self::NodeType(n) | Self::FunctionName(n) | Self::AxisName(n) => {
                format!("'{n}'")
            }
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// 0-based byte offset into the expression.
    pub offset: usize,
}

/// Tokenizer over one expression string.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer for `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenizes the whole input.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Syntax`] on characters that cannot start a
    /// token, unterminated literals, and unsupported constructs such as
    /// variables and arithmetic. A `-` written directly before a number in
    /// operand position is a negative literal, not subtraction.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, PathError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let offset = self.pos;
            let prev = tokens.last().map(|s: &Spanned| &s.token);
            let Some(token) = self.next_token(prev)? else {
                break;
            };
            tokens.push(Spanned { token, offset });
        }
        classify_names(&mut tokens);
        Ok(tokens)
    }

    fn next_token(&mut self, prev: Option<&Token>) -> Result<Option<Token>, PathError> {
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            '@' => self.single(Token::At),
            ',' => self.single(Token::Comma),
            '|' => self.single(Token::Pipe),
            '*' => self.single(Token::Star),
            '=' => self.single(Token::Eq),
            '/' => {
                if self.rest().starts_with("//") {
                    self.pos += 2;
                    Token::DoubleSlash
                } else {
                    self.single(Token::Slash)
                }
            }
            '<' => self.one_or_two('=', Token::Lt, Token::Lte),
            '>' => self.one_or_two('=', Token::Gt, Token::Gte),
            '!' => {
                if self.rest().starts_with("!=") {
                    self.pos += 2;
                    Token::Neq
                } else {
                    return Err(self.error("expected '=' after '!'"));
                }
            }
            ':' => {
                if self.rest().starts_with("::") {
                    self.pos += 2;
                    Token::ColonColon
                } else {
                    return Err(self.error("unexpected ':'"));
                }
            }
            '.' => {
                if self.rest().starts_with("..") {
                    self.pos += 2;
                    Token::DotDot
                } else if self.rest()[1..].starts_with(|c: char| c.is_ascii_digit()) {
                    self.number()
                } else {
                    self.single(Token::Dot)
                }
            }
            '"' | '\'' => self.literal(c)?,
            '$' => return Err(self.error("variable references are not supported")),
            '-' if !prev.is_some_and(ends_operand) && self.negative_number_follows() => {
                self.pos += 1;
                match self.number() {
                    Token::Number(n) => Token::Number(-n),
                    other => other,
                }
            }
            '+' | '-' => return Err(self.error("arithmetic operators are not supported")),
            c if c.is_ascii_digit() => self.number(),
            c if is_name_start(c) => Token::Name(self.name()),
            c => return Err(self.error(&format!("unexpected character '{c}'"))),
        };
        Ok(Some(token))
    }

    /// A `-` directly followed by `1`, `.5` and the like.
    fn negative_number_follows(&self) -> bool {
        let digits = &self.rest()[1..];
        digits.starts_with(|c: char| c.is_ascii_digit())
            || (digits.starts_with('.') && digits[1..].starts_with(|c: char| c.is_ascii_digit()))
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn one_or_two(&mut self, second: char, one: Token, two: Token) -> Token {
        self.pos += 1;
        if self.peek() == Some(second) {
            self.pos += second.len_utf8();
            two
        } else {
            one
        }
    }

    fn literal(&mut self, quote: char) -> Result<Token, PathError> {
        let start = self.pos;
        self.pos += 1;
        match self.rest().find(quote) {
            Some(len) => {
                let value = self.rest()[..len].to_string();
                self.pos += len + 1;
                Ok(Token::Literal(value))
            }
            None => Err(PathError::syntax("unterminated string literal", start)),
        }
    }

    fn number(&mut self) -> Token {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' && !seen_dot && !self.rest().starts_with("..") {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        // Digits with at most one dot always parse.
        let value = self.input[start..self.pos].parse().unwrap_or(f64::NAN);
        Token::Number(value)
    }

    /// Reads a name, joining `prefix:local` but stopping before `::`.
    fn name(&mut self) -> String {
        let start = self.pos;
        self.advance_while(is_name_char);
        let rest = self.rest();
        if rest.starts_with(':') && !rest.starts_with("::") && rest[1..].starts_with(is_name_start) {
            self.pos += 1;
            self.advance_while(is_name_char);
        }
        self.input[start..self.pos].to_string()
    }

    fn advance_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        self.advance_while(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn error(&self, message: &str) -> PathError {
        PathError::syntax(message, self.pos)
    }
}

fn classify_names(tokens: &mut [Spanned]) {
    for i in 0..tokens.len() {
        let Token::Name(name) = &tokens[i].token else {
            continue;
        };
        let after_operand = i > 0 && ends_operand(&tokens[i - 1].token);
        let next = tokens.get(i + 1).map(|t| &t.token);

        let classified = if after_operand && name == "and" {
            Token::And
        } else if after_operand && name == "or" {
            Token::Or
        } else if matches!(next, Some(Token::LeftParen)) {
            if NODE_TYPE_NAMES.contains(&name.as_str()) {
                Token::NodeType(name.clone())
            } else {
                Token::FunctionName(name.clone())
            }
        } else if matches!(next, Some(Token::ColonColon)) {
            Token::AxisName(name.clone())
        } else {
            continue;
        };
        tokens[i].token = classified;
    }
}

fn ends_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::RightParen
            | Token::RightBracket
            | Token::Dot
            | Token::DotDot
            | Token::Star
            | Token::Literal(_)
            | Token::Number(_)
            | Token::Name(_)
    )
}

fn is_name_start(c: char) -> bool {
    c != ':' && crate::parser::chars::is_name_start_char(c)
}

fn is_name_char(c: char) -> bool {
    c != ':' && crate::parser::chars::is_name_char(c)
}

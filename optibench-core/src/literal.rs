//! Literal Grammar
//!
//! Strict recursive-descent parser for the list/dict literal text some solvers
//! print as their result, e.g. `[[-1.5, inf], {'x': [0, 1]}]`. Nothing is ever
//! evaluated; input that does not match the grammar is rejected.
//!
//! ```text
//! value  := list | tuple | dict | number | string
//! list   := '[' (value (',' value)* ','?)? ']'
//! tuple  := '(' (value (',' value)* ','?)? ')'
//! dict   := '{' (value ':' value (',' value ':' value)* ','?)? '}'
//! number := float literal | ['+'|'-'] ('inf' | 'infinity' | 'nan')
//! string := '\'' ... '\'' | '"' ... '"'
//! ```

use thiserror::Error;

/// Deepest list/tuple/dict nesting accepted before the input is rejected
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Error, PartialEq)]
pub enum LiteralError {
    #[error("Unexpected end of input")]
    UnexpectedEnd,

    #[error("Unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Trailing input at offset {0}")]
    TrailingInput(usize),

    #[error("Nesting deeper than {MAX_DEPTH} levels at offset {0}")]
    TooDeep(usize),
}

/// Parsed literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    List(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Literal::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Parse exactly one literal, allowing surrounding whitespace
pub fn parse_literal(input: &str) -> Result<Literal, LiteralError> {
    let mut parser = Parser {
        src: input.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(LiteralError::TrailingInput(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    fn unexpected(&self) -> LiteralError {
        match self.src.get(self.pos) {
            Some(&b) => LiteralError::UnexpectedChar {
                found: b as char,
                offset: self.pos,
            },
            None => LiteralError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), LiteralError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        match self.peek() {
            Some(b'[') => self.nested(|p| p.sequence(b'[', b']').map(Literal::List)),
            Some(b'(') => self.nested(|p| p.sequence(b'(', b')').map(Literal::List)),
            Some(b'{') => self.nested(Self::dict),
            Some(b'\'') | Some(b'"') => self.string(),
            Some(_) => self.number(),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    /// Parse one container level, bounding recursion by [`MAX_DEPTH`]
    fn nested<F>(&mut self, parse: F) -> Result<Literal, LiteralError>
    where
        F: FnOnce(&mut Self) -> Result<Literal, LiteralError>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(LiteralError::TooDeep(self.pos));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn sequence(&mut self, open: u8, close: u8) -> Result<Vec<Literal>, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.value()?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {}
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn dict(&mut self) -> Result<Literal, LiteralError> {
        self.expect(b'{')?;
        let mut entries = Vec::new();
        loop {
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Literal::Dict(entries));
            }
            let key = self.value()?;
            self.expect(b':')?;
            let value = self.value()?;
            entries.push((key, value));
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn string(&mut self) -> Result<Literal, LiteralError> {
        let quote = self.src[self.pos];
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.src.len() && self.src[self.pos] != quote {
            self.pos += 1;
        }
        if self.pos >= self.src.len() {
            return Err(LiteralError::UnexpectedEnd);
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        self.pos += 1;
        Ok(Literal::Str(text))
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while self.pos < self.src.len() {
            let b = self.src[self.pos];
            if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        let token = String::from_utf8_lossy(&self.src[start..self.pos]);
        token
            .parse::<f64>()
            .map(Literal::Number)
            .map_err(|_| LiteralError::InvalidNumber(token.into_owned()))
    }
}

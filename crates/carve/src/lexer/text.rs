//! # Text Lexer
//!
//! General-purpose scanner for program-like text: identifiers, integer and
//! float literals, double-quoted strings, single-quoted characters and
//! backquoted raw strings. Whitespace and `//` / `/* */` comments are skipped.
//! Any other character becomes a single-character token whose kind is the
//! character's code point.

use crate::error::{LexError, StreamError};
use crate::lexer::{Definition, Lexer, Position, SymbolTable, Token, TokenKind};

/// The default lexer used when a parser is built without one.
#[derive(Debug, Clone)]
pub struct TextLexer {
    symbols: SymbolTable,
}

impl TextLexer {
    pub const IDENT: TokenKind = TokenKind(-2);
    pub const INT: TokenKind = TokenKind(-3);
    pub const FLOAT: TokenKind = TokenKind(-4);
    pub const CHAR: TokenKind = TokenKind(-5);
    pub const STRING: TokenKind = TokenKind(-6);
    pub const RAW_STRING: TokenKind = TokenKind(-7);

    #[must_use]
    pub fn new() -> Self {
        let symbols = SymbolTable::new()
            .with("Ident", Self::IDENT)
            .with("Int", Self::INT)
            .with("Float", Self::FLOAT)
            .with("Char", Self::CHAR)
            .with("String", Self::STRING)
            .with("RawString", Self::RAW_STRING);
        Self { symbols }
    }
}

impl Default for TextLexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Definition for TextLexer {
    fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    fn lex<'a>(&'a self, input: &'a str) -> Result<Box<dyn Lexer + 'a>, StreamError> {
        Ok(Box::new(TextScanner {
            input,
            pos: Position::default(),
        }))
    }
}

struct TextScanner<'a> {
    input: &'a str,
    pos: Position,
}

impl TextScanner<'_> {
    fn rest(&self) -> &str {
        &self.input[self.pos.offset..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos.advance(c);
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek_char().is_some_and(&pred) {
            self.bump();
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek_char(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => self.bump_while(|c| c != '\n'),
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek_char() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(LexError::new(start, "comment not terminated")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn number(&mut self) -> TokenKind {
        if self.peek_char() == Some('0') && matches!(self.peek_second(), Some('x' | 'X')) {
            self.bump();
            self.bump();
            self.bump_while(|c| c.is_ascii_hexdigit() || c == '_');
            return TextLexer::INT;
        }
        let mut kind = TextLexer::INT;
        self.bump_while(|c| c.is_ascii_digit() || c == '_');
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            kind = TextLexer::FLOAT;
            self.bump();
            self.bump_while(|c| c.is_ascii_digit() || c == '_');
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let sign = matches!(self.peek_second(), Some('+' | '-'));
            let digit_at = usize::from(sign) + 1;
            if self.rest().chars().nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                kind = TextLexer::FLOAT;
                for _ in 0..digit_at {
                    self.bump();
                }
                self.bump_while(|c| c.is_ascii_digit());
            }
        }
        kind
    }

    fn quoted(&mut self, quote: char, escapes: bool, what: &str) -> Result<(), LexError> {
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(()),
                Some('\\') if escapes => {
                    if self.bump().is_none() {
                        break;
                    }
                }
                Some('\n') if quote != '`' => break,
                Some(_) => {}
                None => break,
            }
        }
        Err(LexError::new(start, format!("{what} literal not terminated")))
    }
}

impl Lexer for TextScanner<'_> {
    fn next(&mut self) -> Result<Token, StreamError> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(Token::eof(start));
        };
        let kind = match c {
            c if c.is_alphabetic() || c == '_' => {
                self.bump_while(|c| c.is_alphanumeric() || c == '_');
                TextLexer::IDENT
            }
            c if c.is_ascii_digit() => self.number(),
            '"' => {
                self.quoted('"', true, "string")?;
                TextLexer::STRING
            }
            '\'' => {
                self.quoted('\'', true, "char")?;
                TextLexer::CHAR
            }
            '`' => {
                self.quoted('`', false, "raw string")?;
                TextLexer::RAW_STRING
            }
            c => {
                self.bump();
                TokenKind::of_char(c)
            }
        };
        let text = &self.input[start.offset..self.pos.offset];
        Ok(Token::new(kind, text, start))
    }
}

use compact_str::CompactString;
use std::fmt;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Numeric token type, as exposed by a lexer's [`SymbolTable`](super::SymbolTable).
///
/// Negative values are named symbols; lexers that emit punctuation as
/// single characters use the character's code point as the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TokenKind(pub i32);

impl TokenKind {
    /// Kind of the end-of-stream sentinel.
    pub const EOF: Self = Self(-1);

    #[must_use]
    pub const fn is_eof(self) -> bool {
        self.0 == Self::EOF.0
    }

    /// Kind for a single-character punctuation token.
    #[must_use]
    pub const fn of_char(c: char) -> Self {
        Self(c as i32)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a token in the source text.
///
/// `offset` is a 0-based byte offset; `line` and `column` are 1-based, with
/// columns counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Move past one character of source text.
    pub const fn advance(&mut self, c: char) {
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    pub fn advance_str(&mut self, text: &str) {
        for c in text.chars() {
            self.advance(c);
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A token produced by a lexer.
///
/// Tokens are immutable once produced; mappers replace them rather than
/// editing them in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    pub text: CompactString,
    pub pos: Position,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, text: impl Into<CompactString>, pos: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    /// The end-of-stream sentinel at `pos`.
    #[must_use]
    pub fn eof(pos: Position) -> Self {
        Self::new(TokenKind::EOF, CompactString::default(), pos)
    }

    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.kind.is_eof()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eof() {
            f.write_str("<EOF>")
        } else {
            write!(f, "{:?}", self.text.as_str())
        }
    }
}

//! # Peeking Token Stream
//!
//! Buffered lookahead over a [`Lexer`] with checkpoint/restore for
//! backtracking.
//!
//! ## Usage
//!
//! ```rust
//! use carve::lexer::{Definition, PeekingLexer, TextLexer};
//!
//! let lexer = TextLexer::new();
//! let mut stream = PeekingLexer::new(lexer.lex("a b").unwrap());
//!
//! // Peek ahead without consuming
//! assert_eq!(stream.peek(1).unwrap().text, "b");
//!
//! // Create a checkpoint for backtracking
//! let checkpoint = stream.checkpoint();
//! assert_eq!(stream.next().unwrap().text, "a");
//!
//! // Backtrack
//! stream.restore(checkpoint);
//! assert_eq!(stream.next().unwrap().text, "a");
//! ```

use crate::error::{LexError, StreamError};
use crate::lexer::{Lexer, Position, Token};

/// A saved stream position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checkpoint {
    cursor: usize,
}

impl Checkpoint {
    /// Number of tokens consumed when the checkpoint was taken.
    #[must_use]
    pub const fn cursor(self) -> usize {
        self.cursor
    }
}

/// Lookahead buffer over a token source.
///
/// Tokens are pulled from the source lazily and kept, so restoring a
/// checkpoint never re-lexes. Peeking or consuming past the end yields the
/// EOF sentinel every time.
pub struct PeekingLexer<'a> {
    source: Box<dyn Lexer + 'a>,
    buffer: Vec<Token>,
    cursor: usize,
    eof: Option<Token>,
}

impl<'a> PeekingLexer<'a> {
    #[must_use]
    pub fn new(source: Box<dyn Lexer + 'a>) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            cursor: 0,
            eof: None,
        }
    }

    fn fill(&mut self, index: usize) -> Result<(), StreamError> {
        while self.buffer.len() <= index && self.eof.is_none() {
            let token = self.source.next()?;
            if token.is_eof() {
                self.eof = Some(token);
            } else {
                self.buffer.push(token);
            }
        }
        Ok(())
    }

    /// The token `n` positions ahead of the cursor, without consuming it.
    ///
    /// # Errors
    ///
    /// Propagates failures of the underlying source.
    pub fn peek(&mut self, n: usize) -> Result<&Token, StreamError> {
        let index = self.cursor + n;
        self.fill(index)?;
        match self.buffer.get(index) {
            Some(token) => Ok(token),
            None => self.eof.as_ref().ok_or_else(|| {
                LexError::new(Position::default(), "token source ended without an EOF token").into()
            }),
        }
    }

    /// Consume the next token. At the end of input the EOF sentinel is
    /// returned and the cursor stays put.
    ///
    /// # Errors
    ///
    /// Propagates failures of the underlying source.
    pub fn next(&mut self) -> Result<Token, StreamError> {
        let token = self.peek(0)?.clone();
        if !token.is_eof() {
            self.cursor += 1;
        }
        Ok(token)
    }

    /// Number of tokens consumed so far.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub const fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            cursor: self.cursor,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.cursor = checkpoint.cursor;
    }

    /// # Errors
    ///
    /// Propagates failures of the underlying source.
    pub fn at_eof(&mut self) -> Result<bool, StreamError> {
        Ok(self.peek(0)?.is_eof())
    }
}

impl std::fmt::Debug for PeekingLexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeekingLexer")
            .field("cursor", &self.cursor)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.eof.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Definition, TextLexer, TokenKind};

    struct Failing {
        yielded: bool,
    }

    impl Lexer for Failing {
        fn next(&mut self) -> Result<Token, StreamError> {
            if self.yielded {
                return Err(LexError::new(Position::new(1, 1, 2), "boom").into());
            }
            self.yielded = true;
            Ok(Token::new(TokenKind(-2), "a", Position::default()))
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let lexer = TextLexer::new();
        let mut stream = PeekingLexer::new(lexer.lex("a b c").unwrap());
        assert_eq!(stream.peek(0).unwrap().text, "a");
        assert_eq!(stream.peek(2).unwrap().text, "c");
        assert_eq!(stream.cursor(), 0);
        assert_eq!(stream.next().unwrap().text, "a");
        assert_eq!(stream.cursor(), 1);
    }

    #[test]
    fn test_eof_repeats() {
        let lexer = TextLexer::new();
        let mut stream = PeekingLexer::new(lexer.lex("a").unwrap());
        assert!(stream.peek(5).unwrap().is_eof());
        stream.next().unwrap();
        assert!(stream.next().unwrap().is_eof());
        assert!(stream.next().unwrap().is_eof());
        assert_eq!(stream.cursor(), 1);
        assert!(stream.at_eof().unwrap());
    }

    #[test]
    fn test_restore_checkpoint() {
        let lexer = TextLexer::new();
        let mut stream = PeekingLexer::new(lexer.lex("a b c").unwrap());
        stream.next().unwrap();
        let checkpoint = stream.checkpoint();
        stream.next().unwrap();
        stream.next().unwrap();
        stream.restore(checkpoint);
        assert_eq!(checkpoint.cursor(), 1);
        assert_eq!(stream.next().unwrap().text, "b");
    }

    #[test]
    fn test_source_error_propagates() {
        let mut stream = PeekingLexer::new(Box::new(Failing { yielded: false }));
        assert_eq!(stream.next().unwrap().text, "a");
        let err = stream.peek(0).unwrap_err();
        assert_eq!(err.position(), Some(Position::new(1, 1, 2)));
    }
}

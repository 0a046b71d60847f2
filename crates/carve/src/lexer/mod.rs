//! # Lexing
//!
//! The tokenizer boundary and the token stream the executor reads from.
//!
//! A [`Definition`] describes a tokenizer: it names its token kinds in a
//! [`SymbolTable`] and starts a [`Lexer`] over an input. A [`Lexer`] yields
//! tokens one at a time and returns the EOF sentinel repeatedly once the
//! input is exhausted.
//!
//! Two definitions ship with the crate:
//!
//! - [`TextLexer`]: identifiers, numbers, quoted strings, characters and
//!   single-character punctuation, with whitespace and comments skipped.
//! - [`RegexLexer`]: one regular expression whose named groups become symbols.
//!
//! [`MappingDefinition`] wraps any definition and rewrites its token stream
//! through a chain of [`TokenMapper`]s.

mod mapper;
mod regex;
mod stream;
mod symbols;
mod text;
mod token;

pub use mapper::{MapFn, MappingDefinition, TokenMapper};
pub use regex::RegexLexer;
pub use stream::{Checkpoint, PeekingLexer};
pub use symbols::{CaseFold, SymbolTable};
pub use text::TextLexer;
pub use token::{Position, Token, TokenKind};

use crate::error::StreamError;
use std::sync::Arc;

/// A tokenizer: its symbols, and a way to start lexing an input.
pub trait Definition: Send + Sync {
    fn symbols(&self) -> &SymbolTable;

    /// Start tokenizing `input`.
    ///
    /// # Errors
    ///
    /// Definitions that validate their input eagerly may fail here.
    fn lex<'a>(&'a self, input: &'a str) -> Result<Box<dyn Lexer + 'a>, StreamError>;
}

/// A source of tokens.
pub trait Lexer {
    /// Next token; the EOF sentinel once the input is exhausted, and on
    /// every call after that.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] when the input cannot be tokenized.
    fn next(&mut self) -> Result<Token, StreamError>;
}

impl<D: Definition + ?Sized> Definition for Arc<D> {
    fn symbols(&self) -> &SymbolTable {
        (**self).symbols()
    }

    fn lex<'a>(&'a self, input: &'a str) -> Result<Box<dyn Lexer + 'a>, StreamError> {
        (**self).lex(input)
    }
}

/// Drain `lexer` into a vector ending with the EOF sentinel.
///
/// # Errors
///
/// Propagates the first error the lexer reports.
pub fn consume_all(lexer: &mut dyn Lexer) -> Result<Vec<Token>, StreamError> {
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next()?;
        let done = token.is_eof();
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_all_ends_with_eof() {
        let lexer = TextLexer::new();
        let mut stream = lexer.lex("a b").unwrap();
        let tokens = consume_all(stream.as_mut()).unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(tokens[2].is_eof());
        // Exhausted lexers keep answering with EOF.
        assert!(stream.next().unwrap().is_eof());
    }

    #[test]
    fn test_arc_definition_delegates() {
        let lexer: Arc<dyn Definition> = Arc::new(TextLexer::new());
        assert!(lexer.symbols().get("Ident").is_some());
        let mut stream = lexer.lex("x").unwrap();
        assert_eq!(stream.next().unwrap().text, "x");
    }
}

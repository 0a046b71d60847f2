//! # Error Types
//!
//! Errors raised while building a parser and while running one.
//!
//! ## Overview
//!
//! - [`GrammarError`]: the shape grammar is unusable. Raised once, by
//!   [`Parser::build`](crate::Parser::build), and always fatal.
//! - [`ParseError`]: a single parse call failed. Either the input does not
//!   match ([`SyntaxError`]), the token source failed ([`StreamError`]),
//!   or the caller handed over a target of the wrong type.
//! - [`StreamError`]: the lexer, a token mapper, or the input reader failed.
//!   Stream failures abort the parse immediately; backtracking never
//!   swallows them.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! and carry stable diagnostic codes.

use crate::lexer::{Position, Token};
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Build-time failure of a shape grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("{shape}.{field}: unknown token symbol {symbol:?}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unknown_symbol)))]
    UnknownSymbol {
        shape: String,
        field: String,
        symbol: String,
    },

    #[error("{shape}: capture into undeclared field {field:?}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unknown_field)))]
    UnknownField { shape: String, field: String },

    #[error("{shape}.{field}: {reason}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::malformed)))]
    Malformed {
        shape: String,
        field: String,
        reason: String,
    },

    #[error("{shape}.{field}: {reason}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::capture_mismatch)))]
    CaptureMismatch {
        shape: String,
        field: String,
        reason: String,
    },

    #[error("{shape}.{field}: repetition of {expr} can match empty input")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::nullable_repetition),
            help("make the repeated expression consume at least one token")
        )
    )]
    NullableRepetition {
        shape: String,
        field: String,
        expr: String,
    },

    #[error("left recursion: {}", cycle.join(" -> "))]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::left_recursion)))]
    LeftRecursion { cycle: Vec<String> },

    #[error("{shape} can never finish matching: every alternative recurses without a base case")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::non_terminating)))]
    NonTerminating { shape: String },

    #[error("{shape} declares no grammar")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::empty_shape)))]
    EmptyShape { shape: String },

    #[error("case-insensitive symbol {0:?} is not defined by the lexer")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(grammar::unknown_case_insensitive_symbol))
    )]
    UnknownCaseInsensitiveSymbol(String),

    #[error("token mapper refers to unknown symbol {0:?}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unknown_mapper_symbol)))]
    UnknownMapperSymbol(String),

    #[error("invalid lexer definition: {reason}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_lexer)))]
    InvalidLexer { reason: String },
}

impl GrammarError {
    pub(crate) fn malformed(shape: &str, field: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            shape: shape.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn capture_mismatch(shape: &str, field: &str, reason: impl Into<String>) -> Self {
        Self::CaptureMismatch {
            shape: shape.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// The input does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(parser::syntax)))]
#[error("{position}: {message}")]
pub struct SyntaxError {
    pub position: Position,
    pub message: String,
    /// Rendering of the grammar element that failed to match.
    pub expected: Option<String>,
    /// The offending token, as displayed in the message.
    pub found: Option<String>,
}

impl SyntaxError {
    /// "expected X but got Y" at the position of `found`.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: &Token) -> Self {
        let expected = expected.into();
        let found_text = found.to_string();
        Self {
            position: found.pos,
            message: format!("expected {expected} but got {found_text}"),
            expected: Some(expected),
            found: Some(found_text),
        }
    }

    /// A trailing token nothing in the grammar accounts for.
    #[must_use]
    pub fn unexpected_token(found: &Token) -> Self {
        let found_text = found.to_string();
        Self {
            position: found.pos,
            message: format!("unexpected token {found_text}"),
            expected: None,
            found: Some(found_text),
        }
    }

    #[must_use]
    pub fn invalid(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
            expected: None,
            found: None,
        }
    }
}

/// Failure of a single parse call.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::syntax)))]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::stream)))]
    Stream(#[from] StreamError),

    #[error("must parse into a value of type {expected}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::shape_mismatch)))]
    ShapeMismatch { expected: &'static str },
}

impl ParseError {
    /// Position of the failure, when the error has one.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Syntax(err) => Some(err.position),
            Self::Stream(err) => err.position(),
            Self::ShapeMismatch { .. } => None,
        }
    }

    #[must_use]
    pub const fn as_syntax(&self) -> Option<&SyntaxError> {
        match self {
            Self::Syntax(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self::Stream(StreamError::Lex(err))
    }
}

/// Failure of the token source feeding a parse.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum StreamError {
    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::lex)))]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::map)))]
    Map(#[from] MapError),

    #[error("failed to read input: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::io)))]
    Io(#[from] std::io::Error),
}

impl StreamError {
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        match self {
            Self::Lex(err) => Some(err.position),
            Self::Map(err) => Some(err.position),
            Self::Io(_) => None,
        }
    }
}

/// Lexer error with location information
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("{position}: {message}")]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

impl LexError {
    #[must_use]
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A token mapper rejected a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("{position}: {message}")]
pub struct MapError {
    pub position: Position,
    pub message: String,
}

impl MapError {
    #[must_use]
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

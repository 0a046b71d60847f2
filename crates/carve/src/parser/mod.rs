//! # Parser
//!
//! [`Parser`] bundles a compiled grammar with its tokenizer. It is built once
//! per root shape and is immutable afterwards, so one parser can serve any
//! number of concurrent parse calls.
//!
//! ```rust
//! use carve::{Expr, Parser, ParserConfig, Shape, ShapeBuilder};
//!
//! #[derive(Debug, Default)]
//! struct Call {
//!     name: String,
//!     args: Vec<i64>,
//! }
//!
//! impl Shape for Call {
//!     fn grammar(shape: &mut ShapeBuilder<Self>) {
//!         shape
//!             .field("name", |c| &mut c.name)
//!             .field("args", |c| &mut c.args)
//!             .rule(Expr::capture("name", Expr::kind("Ident")))
//!             .rule(Expr::lit("("))
//!             .rule(Expr::opt(Expr::separated(
//!                 Expr::capture("args", Expr::kind("Int")),
//!                 Expr::lit(","),
//!             )))
//!             .rule(Expr::lit(")"));
//!     }
//! }
//!
//! let parser = Parser::<Call>::build(ParserConfig::default()).unwrap();
//! let call = parser.parse_str("max(1, 2, 3)").unwrap();
//! assert_eq!(call.name, "max");
//! assert_eq!(call.args, [1, 2, 3]);
//! ```

mod config;
mod context;
mod executor;

pub use config::ParserConfig;

use crate::error::{GrammarError, LexError, ParseError, StreamError, SyntaxError};
use crate::grammar::{Ambiguity, Grammar, Shape, compile, lookahead};
use crate::lexer::{
    CaseFold, Definition, Lexer, MappingDefinition, PeekingLexer, Position, SymbolTable, TextLexer, Token, consume_all,
};
use context::ParseContext;
use std::any::Any;
use std::fmt;
use std::io::Read;
use std::marker::PhantomData;
use std::sync::Arc;

/// A parser for shape `S`.
pub struct Parser<S: Shape> {
    grammar: Grammar,
    lexer: Arc<dyn Definition>,
    fold: CaseFold,
    max_depth: usize,
    ambiguities: Vec<Ambiguity>,
    _shape: PhantomData<fn() -> S>,
}

impl<S: Shape> Parser<S> {
    /// Compile `S` and every shape it references.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] when the grammar is unusable or names
    /// symbols the lexer does not define.
    pub fn build(config: ParserConfig) -> Result<Self, GrammarError> {
        let ParserConfig {
            lexer,
            mappers,
            lookahead: with_lookahead,
            case_insensitive,
            max_depth,
        } = config;

        let mut lexer: Arc<dyn Definition> = lexer.unwrap_or_else(|| Arc::new(TextLexer::new()));
        if !mappers.is_empty() {
            let chain = mappers
                .iter()
                .map(|mapper| mapper.resolve(lexer.symbols()))
                .collect::<Result<Vec<_>, _>>()?;
            lexer = Arc::new(MappingDefinition::new(lexer, chain));
        }
        let fold = CaseFold::resolve(lexer.symbols(), &case_insensitive)?;

        let (mut grammar, analysis) = compile::<S>(lexer.symbols())?;
        let ambiguities = if with_lookahead {
            lookahead::resolve(&mut grammar, &analysis)
        } else {
            Vec::new()
        };

        tracing::debug!(
            shape = S::name(),
            shapes = grammar.len(),
            lookahead = with_lookahead,
            ambiguous = ambiguities.len(),
            "built parser"
        );

        Ok(Self {
            grammar,
            lexer,
            fold,
            max_depth,
            ambiguities,
            _shape: PhantomData,
        })
    }

    /// Parse tokens from `lexer` into `target`, which must be an `S`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::ShapeMismatch`] for a target of another type,
    /// a [`SyntaxError`] when the tokens do not match the grammar or are not
    /// all consumed, and any [`StreamError`] raised by the token source.
    pub fn parse_stream(&self, lexer: Box<dyn Lexer + '_>, target: &mut dyn Any) -> Result<(), ParseError> {
        if !target.is::<S>() {
            return Err(ParseError::ShapeMismatch { expected: S::name() });
        }
        let mut ctx = ParseContext::new(&self.grammar, PeekingLexer::new(lexer), &self.fold, self.max_depth);
        let result = self.run(&mut ctx, target);
        if let Err(err) = &result {
            tracing::debug!(shape = S::name(), error = %err, "parse failed");
        }
        result
    }

    fn run(&self, ctx: &mut ParseContext<'_, '_>, target: &mut dyn Any) -> Result<(), ParseError> {
        let root = self.grammar.root();
        let matched = executor::run_shape(ctx, root, target)?;
        let next = ctx.lexer.peek(0)?;
        if matched {
            if next.is_eof() {
                return Ok(());
            }
            return Err(SyntaxError::unexpected_token(next).into());
        }
        // Custom roots have no body to render.
        match self.grammar.body(root) {
            Some(body) if !next.is_eof() => {
                let expected = self.grammar.renderer().node(body);
                Err(SyntaxError::unexpected(expected, next).into())
            }
            _ => Err(SyntaxError::invalid(next.pos, "invalid syntax").into()),
        }
    }

    /// Parse `input` into an existing `target`.
    ///
    /// # Errors
    ///
    /// See [`Parser::parse_stream`].
    pub fn parse_into(&self, input: &str, target: &mut S) -> Result<(), ParseError> {
        let lexer = self.lexer.lex(input)?;
        self.parse_stream(lexer, target)
    }

    /// Parse `input` into a fresh `S`.
    ///
    /// # Errors
    ///
    /// See [`Parser::parse_stream`].
    pub fn parse_str(&self, input: &str) -> Result<S, ParseError> {
        let mut target = S::default();
        self.parse_into(input, &mut target)?;
        Ok(target)
    }

    /// Read all of `reader` and parse it into a fresh `S`.
    ///
    /// # Errors
    ///
    /// Read failures are reported as [`StreamError::Io`]; otherwise see
    /// [`Parser::parse_stream`].
    pub fn parse_reader(&self, mut reader: impl Read) -> Result<S, ParseError> {
        let mut input = String::new();
        reader.read_to_string(&mut input).map_err(StreamError::Io)?;
        self.parse_str(&input)
    }

    /// Parse UTF-8 encoded `input` into a fresh `S`.
    ///
    /// # Errors
    ///
    /// Invalid UTF-8 is a [`StreamError::Lex`] at the first bad byte;
    /// otherwise see [`Parser::parse_stream`].
    pub fn parse_bytes(&self, input: &[u8]) -> Result<S, ParseError> {
        let text = std::str::from_utf8(input).map_err(|err| {
            let mut pos = Position::default();
            pos.advance_str(std::str::from_utf8(&input[..err.valid_up_to()]).unwrap_or_default());
            StreamError::from(LexError::new(pos, "invalid UTF-8"))
        })?;
        self.parse_str(text)
    }

    /// Tokenize `input` through the mapping chain, EOF included.
    ///
    /// # Errors
    ///
    /// Returns the first [`StreamError`] raised while lexing.
    pub fn lex(&self, input: &str) -> Result<Vec<Token>, StreamError> {
        let mut stream = self.lexer.lex(input)?;
        consume_all(stream.as_mut())
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        self.lexer.symbols()
    }

    /// Alternations whose branches share first tokens. Empty unless built
    /// with lookahead.
    #[must_use]
    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    #[must_use]
    pub const fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The tokenizer, mapping chain included.
    #[must_use]
    pub fn definition(&self) -> &Arc<dyn Definition> {
        &self.lexer
    }
}

impl<S: Shape> fmt::Display for Parser<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.grammar, f)
    }
}

impl<S: Shape> fmt::Debug for Parser<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("shape", &S::name())
            .field("shapes", &self.grammar.len())
            .field("max_depth", &self.max_depth)
            .field("ambiguities", &self.ambiguities.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expr, ShapeBuilder};

    #[derive(Debug, Default, PartialEq)]
    struct Assign {
        name: String,
        value: i64,
    }

    impl Shape for Assign {
        fn grammar(shape: &mut ShapeBuilder<Self>) {
            shape
                .field("name", |a| &mut a.name)
                .field("value", |a| &mut a.value)
                .rule(Expr::capture("name", Expr::kind("Ident")))
                .rule(Expr::lit("="))
                .rule(Expr::capture("value", Expr::kind("Int")));
        }
    }

    fn parser() -> Parser<Assign> {
        Parser::build(ParserConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_str() {
        let assign = parser().parse_str("x = 42").unwrap();
        assert_eq!(
            assign,
            Assign {
                name: "x".into(),
                value: 42
            }
        );
    }

    #[test]
    fn test_trailing_token_rejected() {
        let err = parser().parse_str("x = 1 y").unwrap_err();
        let syntax = err.as_syntax().unwrap();
        assert_eq!(syntax.message, "unexpected token \"y\"");
        assert_eq!(syntax.position.column, 7);
    }

    #[test]
    fn test_no_match_before_eof() {
        let err = parser().parse_str("= 1").unwrap_err();
        let syntax = err.as_syntax().unwrap();
        assert_eq!(syntax.expected.as_deref(), Some("@<ident> \"=\" @<int>"));
        assert_eq!(syntax.found.as_deref(), Some("\"=\""));
    }

    #[test]
    fn test_no_match_at_eof() {
        let err = parser().parse_str("").unwrap_err();
        assert_eq!(err.as_syntax().unwrap().message, "invalid syntax");
    }

    #[test]
    fn test_wrong_target_type() {
        let parser = parser();
        let mut wrong = String::new();
        let lexer = parser.definition().lex("x = 1").unwrap();
        let err = parser.parse_stream(lexer, &mut wrong).unwrap_err();
        assert!(matches!(err, ParseError::ShapeMismatch { expected: "Assign" }));
    }

    #[test]
    fn test_parse_reader_io_failure() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk on fire"))
            }
        }

        let err = parser().parse_reader(Broken).unwrap_err();
        assert!(matches!(err, ParseError::Stream(StreamError::Io(_))));
        assert_eq!(parser().parse_reader("y = 7".as_bytes()).unwrap().value, 7);
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parser().parse_bytes(b"z = 3").unwrap().value, 3);

        let err = parser().parse_bytes(b"z = \xff").unwrap_err();
        assert!(matches!(err, ParseError::Stream(StreamError::Lex(_))));
        assert_eq!(err.position().map(|p| p.column), Some(5));
    }

    #[test]
    fn test_display_lists_grammar() {
        assert_eq!(parser().to_string(), "Assign = @<ident> \"=\" @<int> .");
    }
}

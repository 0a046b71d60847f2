//! # Carve
//!
//! Declarative shape grammars compiled to backtracking recursive-descent
//! parsers.
//!
//! ## Overview
//!
//! A *shape* is an ordinary Rust type that describes its own syntax: which
//! fields captured tokens go into, and the rules that match it. Building a
//! [`Parser`] compiles the root shape and every shape it references into a
//! grammar, validates it, and pairs it with a tokenizer. Parsing fills a
//! fresh instance of the root shape.
//!
//! - **Grammar**: shapes, rule expressions and grammar compilation live in
//!   [`grammar`].
//! - **Lexing**: the tokenizer boundary, two stock tokenizers and token
//!   mappers live in [`lexer`].
//! - **Parsing**: [`Parser`] and [`ParserConfig`] live in [`parser`].
//!
//! ## Quick Start
//!
//! ```rust
//! use carve::lexer::RegexLexer;
//! use carve::{Expr, Parser, ParserConfig, Shape, ShapeBuilder};
//!
//! #[derive(Debug, Default)]
//! struct Select {
//!     fields: Vec<String>,
//!     table: String,
//! }
//!
//! impl Shape for Select {
//!     fn grammar(shape: &mut ShapeBuilder<Self>) {
//!         shape
//!             .field("fields", |s| &mut s.fields)
//!             .field("table", |s| &mut s.table)
//!             .rule(Expr::lit_kind("SELECT", "Keyword"))
//!             .rule(Expr::separated(
//!                 Expr::capture("fields", Expr::kind("Ident")),
//!                 Expr::lit(","),
//!             ))
//!             .rule(Expr::lit_kind("FROM", "Keyword"))
//!             .rule(Expr::capture("table", Expr::kind("Ident")));
//!     }
//! }
//!
//! let lexer = RegexLexer::new(
//!     r"(?i)(?P<Keyword>\b(?:SELECT|FROM)\b)|(?P<Ident>[a-z_]\w*)|(?P<Punct>[,*])|(?P<ws>\s+)",
//! )
//! .unwrap();
//! let parser = Parser::<Select>::build(
//!     ParserConfig::default().lexer(lexer).case_insensitive(["Keyword"]),
//! )
//! .unwrap();
//!
//! let select = parser.parse_str("select a, b from t").unwrap();
//! assert_eq!(select.fields, ["a", "b"]);
//! assert_eq!(select.table, "t");
//!
//! let err = parser.parse_str("SELECT FROM t").unwrap_err();
//! assert_eq!(err.position().map(|p| p.column), Some(8));
//! ```
//!
//! ## Feature Flags
//!
//! - `diagnostics`: derive `miette::Diagnostic` for all error types.
//! - `serialize`: `serde` support for tokens and positions.

pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;

pub use error::{GrammarError, LexError, MapError, ParseError, StreamError, SyntaxError};
pub use grammar::{Expr, FieldValue, Grammar, HookOutcome, NestedSlot, Parseable, Shape, ShapeBuilder};
pub use lexer::{Definition, Lexer, PeekingLexer, Position, Token, TokenKind};
pub use parser::{Parser, ParserConfig};

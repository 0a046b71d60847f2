//! # Token Mapping
//!
//! Rewrites a token stream before the parser sees it. Each mapper may drop a
//! token, replace it, or split it into several; mappers run in the order they
//! were configured and never see the EOF sentinel.

use crate::error::{GrammarError, MapError, StreamError};
use crate::lexer::{Definition, Lexer, SymbolTable, Token, TokenKind};
use compact_str::{CompactString, ToCompactString};
use hashbrown::HashSet;
use smallvec::{SmallVec, smallvec};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// A resolved mapping function.
pub type MapFn = Arc<dyn Fn(Token) -> Result<SmallVec<[Token; 1]>, MapError> + Send + Sync>;

/// A configured token mapper.
///
/// Stock mappers name the symbols they act on; the names are resolved against
/// the lexer's [`SymbolTable`] when the parser is built.
#[derive(Clone)]
pub enum TokenMapper {
    Custom(MapFn),
    /// Drop tokens of these symbols.
    Elide(Vec<String>),
    /// Upper-case the text of tokens of these symbols.
    Upper(Vec<String>),
    /// Strip surrounding quotes and resolve backslash escapes.
    Unquote(Vec<String>),
}

impl TokenMapper {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Token) -> Result<SmallVec<[Token; 1]>, MapError> + Send + Sync + 'static,
    {
        Self::Custom(map_fn(f))
    }

    /// Turn the mapper into a function over tokens of `symbols`.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::UnknownMapperSymbol`] for a symbol the lexer
    /// does not define.
    pub fn resolve(&self, symbols: &SymbolTable) -> Result<MapFn, GrammarError> {
        let kinds = |names: &[String]| -> Result<HashSet<TokenKind, ahash::RandomState>, GrammarError> {
            Ok(symbols
                .resolve_all(names)
                .map_err(GrammarError::UnknownMapperSymbol)?
                .into_iter()
                .collect())
        };
        let mapper = match self {
            Self::Custom(f) => Arc::clone(f),
            Self::Elide(names) => {
                let kinds = kinds(names)?;
                map_fn(move |token| {
                    Ok(if kinds.contains(&token.kind) {
                        SmallVec::new()
                    } else {
                        smallvec![token]
                    })
                })
            }
            Self::Upper(names) => {
                let kinds = kinds(names)?;
                map_fn(move |mut token| {
                    if kinds.contains(&token.kind) {
                        token.text = token.text.to_uppercase().to_compact_string();
                    }
                    Ok(smallvec![token])
                })
            }
            Self::Unquote(names) => {
                let kinds = kinds(names)?;
                map_fn(move |mut token| {
                    if kinds.contains(&token.kind) {
                        token.text = unquote(&token)?;
                    }
                    Ok(smallvec![token])
                })
            }
        };
        Ok(mapper)
    }
}

fn map_fn<F>(f: F) -> MapFn
where
    F: Fn(Token) -> Result<SmallVec<[Token; 1]>, MapError> + Send + Sync + 'static,
{
    Arc::new(f)
}

impl fmt::Debug for TokenMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Elide(names) => f.debug_tuple("Elide").field(names).finish(),
            Self::Upper(names) => f.debug_tuple("Upper").field(names).finish(),
            Self::Unquote(names) => f.debug_tuple("Unquote").field(names).finish(),
        }
    }
}

fn unquote(token: &Token) -> Result<CompactString, MapError> {
    let text = token.text.as_str();
    let mut chars = text.chars();
    let (Some(open), Some(close)) = (chars.next(), chars.next_back()) else {
        return Err(MapError::new(token.pos, format!("cannot unquote {text:?}")));
    };
    if open != close || !matches!(open, '"' | '\'' | '`') {
        return Err(MapError::new(token.pos, format!("cannot unquote {text:?}")));
    }
    let body = chars.as_str();
    if open == '`' {
        return Ok(body.into());
    }

    let mut out = CompactString::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some(c @ ('\\' | '"' | '\'')) => c,
            Some(other) => {
                return Err(MapError::new(token.pos, format!("invalid escape sequence \\{other}")));
            }
            None => return Err(MapError::new(token.pos, "dangling backslash")),
        };
        out.push(escaped);
    }
    Ok(out)
}

/// A [`Definition`] whose tokens pass through a chain of mappers.
pub struct MappingDefinition {
    inner: Arc<dyn Definition>,
    mappers: Vec<MapFn>,
}

impl MappingDefinition {
    #[must_use]
    pub fn new(inner: Arc<dyn Definition>, mappers: Vec<MapFn>) -> Self {
        Self { inner, mappers }
    }
}

impl Definition for MappingDefinition {
    fn symbols(&self) -> &SymbolTable {
        self.inner.symbols()
    }

    fn lex<'a>(&'a self, input: &'a str) -> Result<Box<dyn Lexer + 'a>, StreamError> {
        Ok(Box::new(MappingLexer {
            source: self.inner.lex(input)?,
            mappers: &self.mappers,
            pending: VecDeque::new(),
        }))
    }
}

struct MappingLexer<'a> {
    source: Box<dyn Lexer + 'a>,
    mappers: &'a [MapFn],
    pending: VecDeque<Token>,
}

impl Lexer for MappingLexer<'_> {
    fn next(&mut self) -> Result<Token, StreamError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            let token = self.source.next()?;
            if token.is_eof() {
                return Ok(token);
            }
            let mut batch: SmallVec<[Token; 2]> = smallvec![token];
            for mapper in self.mappers {
                let mut mapped = SmallVec::new();
                for token in batch {
                    mapped.extend(mapper(token)?);
                }
                batch = mapped;
            }
            self.pending.extend(batch);
        }
    }
}

use crate::error::MapError;
use crate::lexer::{Definition, Token, TokenMapper};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Options for [`Parser::build`](crate::Parser::build).
///
/// # Example
///
/// ```rust
/// use carve::ParserConfig;
/// use carve::lexer::RegexLexer;
///
/// let lexer = RegexLexer::new(r"(?P<Ident>[a-zA-Z]+)|(?P<Punct>[,;])|(?P<ws>\s+)").unwrap();
/// let config = ParserConfig::default()
///     .lexer(lexer)
///     .lookahead(true)
///     .case_insensitive(["Ident"])
///     .max_depth(256);
/// assert!(config.lookahead);
/// assert_eq!(config.max_depth, 256);
/// ```
#[derive(Clone)]
pub struct ParserConfig {
    /// Tokenizer; the [`TextLexer`](crate::lexer::TextLexer) when `None`.
    pub lexer: Option<Arc<dyn Definition>>,

    /// Applied to the token stream in order.
    pub mappers: Vec<TokenMapper>,

    /// Index alternation branches by their first tokens.
    ///
    /// Branches that cannot start with the next token are skipped; the rest
    /// are still tried in declared order.
    pub lookahead: bool,

    /// Symbols whose literals match regardless of letter case.
    pub case_insensitive: Vec<String>,

    /// Maximum nesting of shapes within one parse.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            lexer: None,
            mappers: Vec::new(),
            lookahead: false,
            case_insensitive: Vec::new(),
            max_depth: 1024,
        }
    }
}

impl ParserConfig {
    #[must_use]
    pub fn lexer(mut self, lexer: impl Definition + 'static) -> Self {
        self.lexer = Some(Arc::new(lexer));
        self
    }

    /// Append a custom token mapper.
    #[must_use]
    pub fn map<F>(mut self, f: F) -> Self
    where
        F: Fn(Token) -> Result<SmallVec<[Token; 1]>, MapError> + Send + Sync + 'static,
    {
        self.mappers.push(TokenMapper::custom(f));
        self
    }

    /// Drop tokens of these symbols.
    #[must_use]
    pub fn elide<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mappers
            .push(TokenMapper::Elide(symbols.into_iter().map(Into::into).collect()));
        self
    }

    /// Upper-case the text of tokens of these symbols.
    #[must_use]
    pub fn upper<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mappers
            .push(TokenMapper::Upper(symbols.into_iter().map(Into::into).collect()));
        self
    }

    /// Unquote string tokens of these symbols.
    #[must_use]
    pub fn unquote<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mappers
            .push(TokenMapper::Unquote(symbols.into_iter().map(Into::into).collect()));
        self
    }

    #[must_use]
    pub const fn lookahead(mut self, enabled: bool) -> Self {
        self.lookahead = enabled;
        self
    }

    #[must_use]
    pub fn case_insensitive<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.case_insensitive.extend(symbols.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("lexer", &self.lexer.as_ref().map(|_| "<custom>"))
            .field("mappers", &self.mappers)
            .field("lookahead", &self.lookahead)
            .field("case_insensitive", &self.case_insensitive)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParserConfig::default();
        assert!(config.lexer.is_none());
        assert!(config.mappers.is_empty());
        assert!(!config.lookahead);
        assert_eq!(config.max_depth, 1024);
    }

    #[test]
    fn test_mappers_accumulate_in_order() {
        let config = ParserConfig::default()
            .elide(["Comment"])
            .map(|token| Ok(smallvec::smallvec![token]))
            .unquote(["String"]);
        assert_eq!(config.mappers.len(), 3);
        assert!(matches!(config.mappers[0], TokenMapper::Elide(ref names) if names == &["Comment"]));
        assert!(matches!(config.mappers[2], TokenMapper::Unquote(_)));
    }
}

use crate::error::{GrammarError, LexError, StreamError};
use crate::lexer::{Definition, Lexer, Position, SymbolTable, Token, TokenKind};
use regex::Regex;

/// A lexer driven by one regular expression.
///
/// Each named capture group is a token type. Groups whose name starts with
/// an upper-case letter become symbols, numbered `-2`, `-3`, ... in the order
/// they appear; groups whose name starts with anything else are matched and
/// discarded (whitespace, comments).
///
/// ```rust
/// use carve::lexer::{Definition, RegexLexer, consume_all};
///
/// let lexer = RegexLexer::new(r"(?P<Number>\d+)|(?P<Plus>\+)|(?P<ws>\s+)").unwrap();
/// let mut stream = lexer.lex("1 + 2").unwrap();
/// let tokens = consume_all(stream.as_mut()).unwrap();
/// assert_eq!(tokens.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct RegexLexer {
    pattern: Regex,
    /// Per capture group: `None` if unnamed, `Some(None)` if elided.
    groups: Vec<Option<Option<TokenKind>>>,
    symbols: SymbolTable,
}

impl RegexLexer {
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidLexer`] when the pattern does not compile
    /// or declares no named groups.
    pub fn new(pattern: &str) -> Result<Self, GrammarError> {
        let anchored = Regex::new(&format!(r"\A(?:{pattern})")).map_err(|err| GrammarError::InvalidLexer {
            reason: err.to_string(),
        })?;
        let mut symbols = SymbolTable::new();
        let mut next_kind = -2;
        let groups: Vec<_> = anchored
            .capture_names()
            .map(|name| {
                let name = name?;
                if name.starts_with(|c: char| c.is_uppercase()) {
                    let kind = TokenKind(next_kind);
                    next_kind -= 1;
                    symbols.insert(name, kind);
                    Some(Some(kind))
                } else {
                    Some(None)
                }
            })
            .collect();
        if groups.iter().all(Option::is_none) {
            return Err(GrammarError::InvalidLexer {
                reason: "pattern declares no named groups".into(),
            });
        }
        Ok(Self {
            pattern: anchored,
            groups,
            symbols,
        })
    }
}

impl Definition for RegexLexer {
    fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    fn lex<'a>(&'a self, input: &'a str) -> Result<Box<dyn Lexer + 'a>, StreamError> {
        Ok(Box::new(RegexStream {
            lexer: self,
            input,
            pos: Position::default(),
        }))
    }
}

struct RegexStream<'a> {
    lexer: &'a RegexLexer,
    input: &'a str,
    pos: Position,
}

impl Lexer for RegexStream<'_> {
    fn next(&mut self) -> Result<Token, StreamError> {
        let input = self.input;
        loop {
            let rest = &input[self.pos.offset..];
            if rest.is_empty() {
                return Ok(Token::eof(self.pos));
            }
            let invalid = || {
                let c = rest.chars().next().unwrap_or_default();
                LexError::new(self.pos, format!("invalid input text {c:?}"))
            };
            let captures = self.lexer.pattern.captures(rest).ok_or_else(invalid)?;
            let matched = captures.get(0).map_or("", |m| m.as_str());
            if matched.is_empty() {
                return Err(invalid().into());
            }
            let role = self
                .lexer
                .groups
                .iter()
                .enumerate()
                .find_map(|(index, role)| role.filter(|_| captures.get(index).is_some()))
                .ok_or_else(invalid)?;
            let start = self.pos;
            self.pos.advance_str(matched);
            if let Some(kind) = role {
                return Ok(Token::new(kind, matched, start));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::consume_all;

    #[test]
    fn test_symbols_from_named_groups() {
        let lexer = RegexLexer::new(r"(?P<NUMBER>\d+)|(?P<PLUS>\+)|(?P<whitespace>\s+)").unwrap();
        let expected: Vec<_> = lexer.symbols().iter().map(|(name, _)| name).collect();
        assert_eq!(expected, ["EOF", "NUMBER", "PLUS"]);

        let mut stream = lexer.lex("1 + 2").unwrap();
        let tokens = consume_all(stream.as_mut()).unwrap();
        let number = lexer.symbols().get("NUMBER").unwrap();
        let plus = lexer.symbols().get("PLUS").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, [number, plus, number, TokenKind::EOF]);
        assert_eq!(tokens[2].text, "2");
        assert_eq!(tokens[2].pos, Position::new(4, 1, 5));
    }

    #[test]
    fn test_invalid_input() {
        let lexer = RegexLexer::new(r"(?P<Ident>[a-z]+)|(?P<ws>\s+)").unwrap();
        let mut stream = lexer.lex("ab ?").unwrap();
        let err = consume_all(stream.as_mut()).unwrap_err();
        assert_eq!(err.position(), Some(Position::new(3, 1, 4)));
    }

    #[test]
    fn test_rejects_bad_pattern() {
        assert!(matches!(RegexLexer::new("(?P<A>"), Err(GrammarError::InvalidLexer { .. })));
        assert!(matches!(RegexLexer::new(r"\d+"), Err(GrammarError::InvalidLexer { .. })));
    }
}

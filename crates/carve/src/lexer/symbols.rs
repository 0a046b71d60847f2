use crate::error::GrammarError;
use crate::lexer::TokenKind;
use compact_str::CompactString;
use hashbrown::{HashMap, HashSet};

/// Ordered mapping from symbol names to token kinds.
///
/// Every table contains `"EOF"`. Insertion order is preserved so grammar
/// renderings and diagnostics list symbols the way the lexer declared them.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: Vec<(CompactString, TokenKind)>,
    by_name: HashMap<CompactString, TokenKind, ahash::RandomState>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            entries: Vec::new(),
            by_name: HashMap::with_hasher(ahash::RandomState::new()),
        };
        table.insert("EOF", TokenKind::EOF);
        table
    }

    /// Register `name`. Re-registering a name replaces its kind.
    pub fn insert(&mut self, name: impl Into<CompactString>, kind: TokenKind) {
        let name = name.into();
        if self.by_name.insert(name.clone(), kind).is_some() {
            if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
                entry.1 = kind;
            }
        } else {
            self.entries.push((name, kind));
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<CompactString>, kind: TokenKind) -> Self {
        self.insert(name, kind);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<TokenKind> {
        self.by_name.get(name).copied()
    }

    /// First name registered for `kind`.
    #[must_use]
    pub fn name_of(&self, kind: TokenKind) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, k)| *k == kind)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TokenKind)> + '_ {
        self.entries.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a list of symbol names, reporting the first unknown one.
    pub(crate) fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<TokenKind>, String> {
        names
            .iter()
            .map(|name| self.get(name.as_ref()).ok_or_else(|| name.as_ref().to_string()))
            .collect()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Token kinds whose literal comparisons ignore letter case.
#[derive(Debug, Clone, Default)]
pub struct CaseFold {
    kinds: HashSet<TokenKind, ahash::RandomState>,
}

impl CaseFold {
    /// Build the set from configured symbol names.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::UnknownCaseInsensitiveSymbol`] for a name the
    /// lexer does not define.
    pub fn resolve<S: AsRef<str>>(symbols: &SymbolTable, names: &[S]) -> Result<Self, GrammarError> {
        let kinds = symbols
            .resolve_all(names)
            .map_err(GrammarError::UnknownCaseInsensitiveSymbol)?;
        Ok(Self {
            kinds: kinds.into_iter().collect(),
        })
    }

    #[must_use]
    pub fn contains(&self, kind: TokenKind) -> bool {
        self.kinds.contains(&kind)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Compare literal text against token text under the policy for `kind`.
    #[must_use]
    pub fn text_eq(&self, kind: TokenKind, expected: &str, actual: &str) -> bool {
        if expected == actual {
            return true;
        }
        self.contains(kind)
            && expected
                .chars()
                .flat_map(char::to_lowercase)
                .eq(actual.chars().flat_map(char::to_lowercase))
    }
}

//! # Lookahead Tables
//!
//! With lookahead enabled, every alternation carries a table of the tokens
//! each branch can start with. The executor consults it to skip branches that
//! cannot match the next token. Branches whose first tokens overlap are
//! still tried in declared order, with backtracking between them.

use crate::grammar::analysis::Analysis;
use crate::grammar::node::{Grammar, Node, Renderer};
use crate::lexer::{CaseFold, Token, TokenKind};
use compact_str::CompactString;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// A token a branch can start with. `None` parts are wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FirstToken {
    pub kind: Option<TokenKind>,
    pub text: Option<CompactString>,
}

impl FirstToken {
    /// Any token, EOF included. Custom shapes start with this.
    pub const ANY: Self = Self {
        kind: None,
        text: None,
    };

    /// Whether `token` could start the branch.
    #[must_use]
    pub fn admits(&self, token: &Token, fold: &CaseFold) -> bool {
        let kind_ok = match self.kind {
            Some(kind) => token.kind == kind,
            None => self.text.is_none() || !token.is_eof(),
        };
        kind_ok
            && self
                .text
                .as_ref()
                .is_none_or(|text| fold.text_eq(token.kind, text, &token.text))
    }

    /// Whether both can start with the same token. An untyped literal is only
    /// compared with other literals, never with a bare kind.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if *self == Self::ANY || *other == Self::ANY {
            return true;
        }
        match (&self.text, &other.text) {
            (Some(a), Some(b)) => {
                a == b
                    && match (self.kind, other.kind) {
                        (Some(x), Some(y)) => x == y,
                        _ => true,
                    }
            }
            _ => self.kind == other.kind,
        }
    }
}

/// Set of [`FirstToken`]s in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirstSet {
    tokens: Vec<FirstToken>,
}

impl FirstSet {
    pub fn insert(&mut self, token: FirstToken) {
        if !self.tokens.contains(&token) {
            self.tokens.push(token);
        }
    }

    pub fn extend_from(&mut self, other: &Self) {
        for token in &other.tokens {
            self.insert(token.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FirstToken> + '_ {
        self.tokens.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    branch: usize,
    text: Option<CompactString>,
}

/// Per-alternation index of branch first tokens.
#[derive(Debug, Clone)]
pub struct LookaheadTable {
    by_kind: HashMap<TokenKind, SmallVec<[Entry; 2]>, ahash::RandomState>,
    /// Entries without a kind restriction.
    any_kind: Vec<Entry>,
    nullable: SmallVec<[usize; 2]>,
    ambiguous: Vec<FirstToken>,
}

impl LookaheadTable {
    #[must_use]
    pub fn build(firsts: &[FirstSet], nullable: &[bool]) -> Self {
        let mut table = Self {
            by_kind: HashMap::with_hasher(ahash::RandomState::new()),
            any_kind: Vec::new(),
            nullable: nullable
                .iter()
                .enumerate()
                .filter_map(|(branch, &n)| n.then_some(branch))
                .collect(),
            ambiguous: Vec::new(),
        };
        for (branch, first) in firsts.iter().enumerate() {
            for token in first.iter() {
                let entry = Entry {
                    branch,
                    text: token.text.clone(),
                };
                match token.kind {
                    Some(kind) => table.by_kind.entry(kind).or_default().push(entry),
                    None => table.any_kind.push(entry),
                }
            }
        }
        for (i, a) in firsts.iter().enumerate() {
            for b in &firsts[i + 1..] {
                for x in a.iter() {
                    for y in b.iter() {
                        if x.overlaps(y) {
                            let shared = if x.text.is_some() || y.kind.is_none() { x } else { y };
                            if !table.ambiguous.contains(shared) {
                                table.ambiguous.push(shared.clone());
                            }
                        }
                    }
                }
            }
        }
        table
    }

    /// Branches that may match starting at `token`, in declared order.
    #[must_use]
    pub fn candidates(&self, token: &Token, fold: &CaseFold) -> SmallVec<[usize; 4]> {
        let text_ok = |entry: &Entry| {
            entry
                .text
                .as_ref()
                .is_none_or(|text| fold.text_eq(token.kind, text, &token.text))
        };
        let mut hits: SmallVec<[usize; 4]> = SmallVec::new();
        if let Some(entries) = self.by_kind.get(&token.kind) {
            hits.extend(entries.iter().filter(|e| text_ok(e)).map(|e| e.branch));
        }
        hits.extend(
            self.any_kind
                .iter()
                .filter(|e| (e.text.is_none() || !token.is_eof()) && text_ok(e))
                .map(|e| e.branch),
        );
        hits.extend(self.nullable.iter().copied());
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguous.is_empty()
    }

    /// First tokens shared by more than one branch.
    #[must_use]
    pub fn ambiguous_tokens(&self) -> &[FirstToken] {
        &self.ambiguous
    }
}

/// An alternation whose branches share first tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub shape: &'static str,
    pub alternation: String,
    pub tokens: Vec<String>,
}

/// Attach a lookahead table to every alternation in `grammar`.
pub fn resolve(grammar: &mut Grammar, analysis: &Analysis) -> Vec<Ambiguity> {
    let renderer = Renderer {
        names: &grammar.names,
        symbols: &grammar.symbols,
    };
    let mut found = Vec::new();
    for shape in grammar.shapes.iter_mut().filter(|s| s.hook.is_none()) {
        annotate(&mut shape.body, shape.name, analysis, renderer, &mut found);
    }
    found
}

fn annotate(
    node: &mut Node,
    shape: &'static str,
    analysis: &Analysis,
    renderer: Renderer<'_>,
    found: &mut Vec<Ambiguity>,
) {
    match node {
        Node::Alternation { branches, lookahead } => {
            for branch in branches.iter_mut() {
                annotate(branch, shape, analysis, renderer, found);
            }
            let firsts: Vec<_> = branches.iter().map(|b| analysis.first_of(b)).collect();
            let nullable: Vec<_> = branches.iter().map(|b| analysis.is_nullable(b)).collect();
            let table = LookaheadTable::build(&firsts, &nullable);
            if table.is_ambiguous() {
                let alternation = branches
                    .iter()
                    .map(|b| renderer.node(b))
                    .collect::<Vec<_>>()
                    .join(" | ");
                let tokens = table
                    .ambiguous_tokens()
                    .iter()
                    .map(|t| renderer.first_token(t))
                    .collect::<Vec<_>>();
                tracing::debug!(shape, %alternation, tokens = ?tokens, "ambiguous alternation");
                found.push(Ambiguity {
                    shape,
                    alternation,
                    tokens,
                });
            }
            *lookahead = Some(table);
        }
        Node::Sequence(children) => {
            for child in children {
                annotate(child, shape, analysis, renderer, found);
            }
        }
        Node::Repetition { child, .. } | Node::Optional(child) | Node::Capture { child, .. } => {
            annotate(child, shape, analysis, renderer, found);
        }
        Node::Literal { .. } | Node::Kind(_) | Node::Reference(_) => {}
    }
}

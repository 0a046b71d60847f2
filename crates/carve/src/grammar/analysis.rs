//! Grammar analysis: nullability, productivity, first sets.
//!
//! [`Analysis::run`] also validates the grammar. A grammar is rejected when a
//! repetition can match empty input, when a shape can never finish matching,
//! or when a shape can begin with itself without consuming a token.

use crate::error::GrammarError;
use crate::grammar::lookahead::{FirstSet, FirstToken};
use crate::grammar::node::{Grammar, Node, Renderer, ShapeIndex};
use crate::grammar::shape::FieldDecl;
use std::convert::Infallible;

/// Per-shape facts derived from a compiled grammar.
#[derive(Debug, Clone)]
pub struct Analysis {
    nullable: Vec<bool>,
    first: Vec<FirstSet>,
}

impl Analysis {
    /// # Errors
    ///
    /// Returns [`GrammarError::NonTerminating`],
    /// [`GrammarError::NullableRepetition`] or [`GrammarError::LeftRecursion`].
    pub fn run(grammar: &Grammar) -> Result<Self, GrammarError> {
        let nullable = fixpoint(grammar, false, nullable_node);
        let productive = fixpoint(grammar, true, productive_node);
        if let Some(index) = productive.iter().position(|p| !p) {
            return Err(GrammarError::NonTerminating {
                shape: grammar.names[index].to_string(),
            });
        }

        let renderer = grammar.renderer();
        for shape in grammar.shapes.iter().filter(|s| s.hook.is_none()) {
            let check = RepetitionCheck {
                shape: shape.name,
                fields: &shape.fields,
                nullable: &nullable,
                renderer,
            };
            check.walk(&shape.body, "_")?;
        }

        let mut walk = FirstWalk {
            grammar,
            nullable: &nullable,
            visits: vec![Visit::Fresh; grammar.len()],
            sets: vec![FirstSet::default(); grammar.len()],
            stack: Vec::new(),
        };
        for index in 0..grammar.len() {
            walk.shape(ShapeIndex(index))?;
        }
        let first = walk.sets;
        Ok(Self { nullable, first })
    }

    #[must_use]
    pub fn shape_nullable(&self, index: ShapeIndex) -> bool {
        self.nullable[index.0]
    }

    #[must_use]
    pub fn shape_first(&self, index: ShapeIndex) -> &FirstSet {
        &self.first[index.0]
    }

    /// Whether `node` can match without consuming a token.
    #[must_use]
    pub fn is_nullable(&self, node: &Node) -> bool {
        nullable_node(node, &self.nullable)
    }

    /// Tokens `node` can start with.
    #[must_use]
    pub fn first_of(&self, node: &Node) -> FirstSet {
        let mut out = FirstSet::default();
        let result: Result<(), Infallible> = collect_first(node, &self.nullable, &mut out, &mut |index, out| {
            out.extend_from(&self.first[index.0]);
            Ok(())
        });
        match result {
            Ok(()) => out,
            Err(never) => match never {},
        }
    }
}

/// Least fixpoint of a per-shape boolean property. Custom shapes get `custom`.
fn fixpoint(grammar: &Grammar, custom: bool, eval: fn(&Node, &[bool]) -> bool) -> Vec<bool> {
    let mut table = vec![false; grammar.len()];
    loop {
        let mut changed = false;
        for (index, shape) in grammar.shapes.iter().enumerate() {
            if table[index] {
                continue;
            }
            let value = if shape.hook.is_some() {
                custom
            } else {
                eval(&shape.body, &table)
            };
            if value {
                table[index] = true;
                changed = true;
            }
        }
        if !changed {
            return table;
        }
    }
}

pub(crate) fn nullable_node(node: &Node, shapes: &[bool]) -> bool {
    match node {
        Node::Sequence(children) => children.iter().all(|c| nullable_node(c, shapes)),
        Node::Alternation { branches, .. } => branches.iter().any(|b| nullable_node(b, shapes)),
        Node::Repetition { child, min } => *min == 0 || nullable_node(child, shapes),
        Node::Optional(_) => true,
        Node::Capture { child, .. } => nullable_node(child, shapes),
        Node::Literal { .. } => false,
        // EOF matches without being consumed.
        Node::Kind(kind) => kind.is_eof(),
        Node::Reference(index) => shapes[index.0],
    }
}

fn productive_node(node: &Node, shapes: &[bool]) -> bool {
    match node {
        Node::Sequence(children) => children.iter().all(|c| productive_node(c, shapes)),
        Node::Alternation { branches, .. } => branches.iter().any(|b| productive_node(b, shapes)),
        Node::Repetition { child, min } => *min == 0 || productive_node(child, shapes),
        Node::Optional(_) => true,
        Node::Capture { child, .. } => productive_node(child, shapes),
        Node::Literal { .. } | Node::Kind(_) => true,
        Node::Reference(index) => shapes[index.0],
    }
}

struct RepetitionCheck<'a> {
    shape: &'static str,
    fields: &'a [FieldDecl],
    nullable: &'a [bool],
    renderer: Renderer<'a>,
}

impl RepetitionCheck<'_> {
    fn walk(&self, node: &Node, field: &str) -> Result<(), GrammarError> {
        match node {
            Node::Sequence(children) | Node::Alternation { branches: children, .. } => {
                for child in children {
                    self.walk(child, field)?;
                }
            }
            Node::Repetition { child, .. } => {
                if nullable_node(child, self.nullable) {
                    return Err(GrammarError::NullableRepetition {
                        shape: self.shape.to_string(),
                        field: field.to_string(),
                        expr: self.renderer.node(child),
                    });
                }
                self.walk(child, field)?;
            }
            Node::Optional(child) => self.walk(child, field)?,
            Node::Capture { field: index, child } => {
                let name = self.fields.get(index.0).map_or(field, |decl| decl.name);
                self.walk(child, name)?;
            }
            Node::Literal { .. } | Node::Kind(_) | Node::Reference(_) => {}
        }
        Ok(())
    }
}

/// Adds the tokens `node` can start with to `out`. Shape references are
/// delegated to `reference`.
fn collect_first<E>(
    node: &Node,
    nullable: &[bool],
    out: &mut FirstSet,
    reference: &mut dyn FnMut(ShapeIndex, &mut FirstSet) -> Result<(), E>,
) -> Result<(), E> {
    match node {
        Node::Literal { text, kind } => out.insert(FirstToken {
            kind: *kind,
            text: Some(text.clone()),
        }),
        Node::Kind(kind) => out.insert(FirstToken {
            kind: Some(*kind),
            text: None,
        }),
        Node::Sequence(children) => {
            for child in children {
                collect_first(child, nullable, out, reference)?;
                if !nullable_node(child, nullable) {
                    break;
                }
            }
        }
        Node::Alternation { branches, .. } => {
            for branch in branches {
                collect_first(branch, nullable, out, reference)?;
            }
        }
        Node::Repetition { child, .. } | Node::Optional(child) | Node::Capture { child, .. } => {
            collect_first(child, nullable, out, reference)?;
        }
        Node::Reference(index) => reference(*index, out)?,
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Fresh,
    Active,
    Done,
}

struct FirstWalk<'g> {
    grammar: &'g Grammar,
    nullable: &'g [bool],
    visits: Vec<Visit>,
    sets: Vec<FirstSet>,
    stack: Vec<ShapeIndex>,
}

impl FirstWalk<'_> {
    fn shape(&mut self, index: ShapeIndex) -> Result<(), GrammarError> {
        match self.visits[index.0] {
            Visit::Done => Ok(()),
            Visit::Active => {
                let start = self.stack.iter().position(|&i| i == index).unwrap_or(0);
                let cycle = self.stack[start..]
                    .iter()
                    .chain(std::iter::once(&index))
                    .map(|&i| self.grammar.shape_name(i).to_string())
                    .collect();
                Err(GrammarError::LeftRecursion { cycle })
            }
            Visit::Fresh => {
                self.visits[index.0] = Visit::Active;
                self.stack.push(index);
                let grammar = self.grammar;
                let nullable = self.nullable;
                let shape = grammar.shape(index);
                let mut set = FirstSet::default();
                if shape.hook.is_some() {
                    set.insert(FirstToken::ANY);
                } else {
                    collect_first::<GrammarError>(&shape.body, nullable, &mut set, &mut |nested, out| {
                        self.shape(nested)?;
                        out.extend_from(&self.sets[nested.0]);
                        Ok(())
                    })?;
                }
                self.stack.pop();
                self.visits[index.0] = Visit::Done;
                self.sets[index.0] = set;
                Ok(())
            }
        }
    }
}

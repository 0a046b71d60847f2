//! Compiled grammar: an arena of shapes whose bodies are [`Node`] trees.

use crate::grammar::lookahead::{FirstToken, LookaheadTable};
use crate::grammar::shape::{FieldDecl, HookFn, PositionSetter};
use crate::lexer::{SymbolTable, TokenKind};
use compact_str::CompactString;
use std::any::Any;
use std::fmt::{self, Write};

/// Index of a compiled shape in its [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeIndex(pub(crate) usize);

/// Index of a field within its owning shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldIndex(pub(crate) usize);

/// A matcher.
#[derive(Debug, Clone)]
pub enum Node {
    Sequence(Vec<Node>),
    Alternation {
        branches: Vec<Node>,
        lookahead: Option<LookaheadTable>,
    },
    Repetition {
        child: Box<Node>,
        min: usize,
    },
    Optional(Box<Node>),
    Capture {
        field: FieldIndex,
        child: Box<Node>,
    },
    /// One token with this text. Without a kind, any non-EOF kind matches.
    Literal {
        text: CompactString,
        kind: Option<TokenKind>,
    },
    Kind(TokenKind),
    Reference(ShapeIndex),
}

pub(crate) struct CompiledShape {
    pub(crate) name: &'static str,
    pub(crate) body: Node,
    pub(crate) fields: Vec<FieldDecl>,
    pub(crate) position: Option<PositionSetter>,
    pub(crate) hook: Option<HookFn>,
    pub(crate) construct: fn() -> Box<dyn Any + Send>,
}

impl fmt::Debug for CompiledShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledShape")
            .field("name", &self.name)
            .field("body", &self.body)
            .field("fields", &self.fields.iter().map(|d| d.name).collect::<Vec<_>>())
            .field("custom", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

/// All shapes reachable from a root shape, compiled.
#[derive(Debug)]
pub struct Grammar {
    pub(crate) shapes: Vec<CompiledShape>,
    pub(crate) names: Vec<&'static str>,
    pub(crate) symbols: SymbolTable,
    pub(crate) root: ShapeIndex,
}

impl Grammar {
    #[must_use]
    pub const fn root(&self) -> ShapeIndex {
        self.root
    }

    /// Number of compiled shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub(crate) fn shape(&self, index: ShapeIndex) -> &CompiledShape {
        &self.shapes[index.0]
    }

    #[must_use]
    pub fn shape_name(&self, index: ShapeIndex) -> &'static str {
        self.names[index.0]
    }

    /// The shape's body, or `None` for custom shapes.
    #[must_use]
    pub fn body(&self, index: ShapeIndex) -> Option<&Node> {
        let shape = self.shapes.get(index.0)?;
        shape.hook.is_none().then_some(&shape.body)
    }

    pub(crate) fn renderer(&self) -> Renderer<'_> {
        Renderer {
            names: &self.names,
            symbols: &self.symbols,
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let renderer = self.renderer();
        for (index, shape) in self.shapes.iter().enumerate() {
            if index > 0 {
                f.write_char('\n')?;
            }
            if shape.hook.is_some() {
                write!(f, "{} = <custom> .", shape.name)?;
            } else {
                write!(f, "{} = {} .", shape.name, renderer.node(&shape.body))?;
            }
        }
        Ok(())
    }
}

/// Renders nodes as EBNF for grammar listings and error messages.
#[derive(Clone, Copy)]
pub(crate) struct Renderer<'a> {
    pub(crate) names: &'a [&'static str],
    pub(crate) symbols: &'a SymbolTable,
}

impl Renderer<'_> {
    pub(crate) fn node(&self, node: &Node) -> String {
        let mut out = String::new();
        self.write(&mut out, node, false);
        out
    }

    fn kind_name(&self, kind: TokenKind) -> String {
        match self.symbols.name_of(kind) {
            Some(name) => name.to_lowercase(),
            None => u32::try_from(kind.0)
                .ok()
                .and_then(char::from_u32)
                .map_or_else(|| kind.to_string(), |c| format!("{c:?}")),
        }
    }

    pub(crate) fn first_token(&self, token: &FirstToken) -> String {
        match (&token.kind, &token.text) {
            (_, Some(text)) => format!("{:?}", text.as_str()),
            (Some(kind), None) => format!("<{}>", self.kind_name(*kind)),
            (None, None) => "<any>".to_string(),
        }
    }

    fn write(&self, out: &mut String, node: &Node, nested: bool) {
        match node {
            Node::Sequence(children) => {
                if nested {
                    out.push_str("( ");
                }
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.write(out, child, true);
                }
                if nested {
                    out.push_str(" )");
                }
            }
            Node::Alternation { branches, .. } => {
                if nested {
                    out.push_str("( ");
                }
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" | ");
                    }
                    self.write(out, branch, false);
                }
                if nested {
                    out.push_str(" )");
                }
            }
            Node::Repetition { child, min } => {
                out.push_str("{ ");
                self.write(out, child, false);
                out.push_str(if *min == 0 { " }" } else { " }+" });
            }
            Node::Optional(child) => {
                out.push_str("[ ");
                self.write(out, child, false);
                out.push_str(" ]");
            }
            Node::Capture { child, .. } => {
                out.push('@');
                self.write(out, child, true);
            }
            Node::Literal { text, kind } => {
                let _ = write!(out, "{:?}", text.as_str());
                if let Some(kind) = kind
                    && let Some(name) = self.symbols.name_of(*kind)
                {
                    let _ = write!(out, ":{name}");
                }
            }
            Node::Kind(kind) => {
                let _ = write!(out, "<{}>", self.kind_name(*kind));
            }
            Node::Reference(index) => out.push_str(self.names[index.0]),
        }
    }
}

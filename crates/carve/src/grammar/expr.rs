//! Grammar expressions, the building blocks of shape rules.

use crate::error::GrammarError;
use crate::grammar::compiler::Compiler;
use crate::grammar::node::ShapeIndex;
use crate::grammar::shape::Shape;
use compact_str::CompactString;
use std::any::TypeId;
use std::fmt;

/// A reference to a nested shape type.
#[derive(Clone, Copy)]
pub struct ShapeRef {
    pub(crate) type_id: TypeId,
    pub(crate) name: fn() -> &'static str,
    pub(crate) compile: for<'a, 'b> fn(&'a mut Compiler<'b>) -> Result<ShapeIndex, GrammarError>,
}

impl ShapeRef {
    #[must_use]
    pub fn of<N: Shape>() -> Self {
        Self {
            type_id: TypeId::of::<N>(),
            name: N::name,
            compile: compile_nested::<N>,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        (self.name)()
    }
}

fn compile_nested<N: Shape>(compiler: &mut Compiler<'_>) -> Result<ShapeIndex, GrammarError> {
    compiler.shape_index::<N>()
}

impl fmt::Debug for ShapeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShapeRef").field(&self.name()).finish()
    }
}

impl PartialEq for ShapeRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

/// Grammar expression for a shape rule.
///
/// Symbol names are resolved against the lexer when the parser is built, so
/// expressions can be written before a lexer is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A token with exactly this text, optionally restricted to one symbol.
    Literal {
        text: CompactString,
        symbol: Option<CompactString>,
    },
    /// Any token of the named symbol.
    Kind(CompactString),
    /// A nested shape.
    Shape(ShapeRef),
    /// Write everything the inner expression matches into a field.
    Capture {
        field: CompactString,
        expr: Box<Expr>,
    },
    Seq(Vec<Expr>),
    /// Ordered choice: the first alternative that matches wins.
    Alt(Vec<Expr>),
    Opt(Box<Expr>),
    /// Unbounded repetition with at least `min` matches.
    Repeat { expr: Box<Expr>, min: usize },
}

impl Expr {
    #[must_use]
    pub fn lit(text: impl Into<CompactString>) -> Self {
        Self::Literal {
            text: text.into(),
            symbol: None,
        }
    }

    #[must_use]
    pub fn lit_kind(text: impl Into<CompactString>, symbol: impl Into<CompactString>) -> Self {
        Self::Literal {
            text: text.into(),
            symbol: Some(symbol.into()),
        }
    }

    #[must_use]
    pub fn kind(symbol: impl Into<CompactString>) -> Self {
        Self::Kind(symbol.into())
    }

    #[must_use]
    pub fn shape<N: Shape>() -> Self {
        Self::Shape(ShapeRef::of::<N>())
    }

    #[must_use]
    pub fn capture(field: impl Into<CompactString>, expr: Self) -> Self {
        Self::Capture {
            field: field.into(),
            expr: Box::new(expr),
        }
    }

    /// Create a sequence expression
    #[must_use]
    pub fn seq<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let exprs: Vec<_> = exprs.into_iter().collect();
        match <[Self; 1]>::try_from(exprs) {
            Ok([single]) => single,
            Err(exprs) => Self::Seq(exprs),
        }
    }

    /// Create an ordered choice expression
    #[must_use]
    pub fn alt<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let exprs: Vec<_> = exprs.into_iter().collect();
        match <[Self; 1]>::try_from(exprs) {
            Ok([single]) => single,
            Err(exprs) => Self::Alt(exprs),
        }
    }

    #[must_use]
    pub fn opt(expr: Self) -> Self {
        Self::Opt(Box::new(expr))
    }

    /// Zero or more
    #[must_use]
    pub fn star(expr: Self) -> Self {
        Self::Repeat {
            expr: Box::new(expr),
            min: 0,
        }
    }

    /// One or more
    #[must_use]
    pub fn plus(expr: Self) -> Self {
        Self::Repeat {
            expr: Box::new(expr),
            min: 1,
        }
    }

    /// `item (sep item)*`
    #[must_use]
    pub fn separated(item: Self, sep: Self) -> Self {
        Self::seq([item.clone(), Self::star(Self::seq([sep, item]))])
    }

    /// What a capture of this expression would write: whether any tokens,
    /// and which nested shapes.
    pub(crate) fn produced(&self, tokens: &mut bool, shapes: &mut Vec<ShapeRef>) {
        match self {
            Self::Literal { .. } | Self::Kind(_) => *tokens = true,
            Self::Shape(shape) => {
                if !shapes.contains(shape) {
                    shapes.push(*shape);
                }
            }
            Self::Capture { expr, .. } | Self::Opt(expr) | Self::Repeat { expr, .. } => {
                expr.produced(tokens, shapes);
            }
            Self::Seq(exprs) | Self::Alt(exprs) => {
                for expr in exprs {
                    expr.produced(tokens, shapes);
                }
            }
        }
    }
}

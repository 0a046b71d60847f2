use crate::error::GrammarError;
use crate::grammar::analysis::Analysis;
use crate::grammar::expr::{Expr, ShapeRef};
use crate::grammar::node::{CompiledShape, FieldIndex, Grammar, Node, ShapeIndex};
use crate::grammar::shape::{FieldDecl, FieldSink, Shape, ShapeBuilder};
use crate::lexer::{SymbolTable, TokenKind};
use hashbrown::HashMap;
use std::any::{Any, TypeId};

/// Compile shape `S` and everything it references.
///
/// # Errors
///
/// Returns the first [`GrammarError`] found while compiling or validating.
pub fn compile<S: Shape>(symbols: &SymbolTable) -> Result<(Grammar, Analysis), GrammarError> {
    Compiler::new(symbols).compile::<S>()
}

/// Walks shape declarations and builds the node arena.
///
/// Shapes are memoized by `TypeId`; a shape's slot is reserved before its
/// rules are compiled so recursive references resolve to it.
pub struct Compiler<'s> {
    symbols: &'s SymbolTable,
    slots: Vec<Option<CompiledShape>>,
    names: Vec<&'static str>,
    index: HashMap<TypeId, ShapeIndex, ahash::RandomState>,
}

struct Scope<'a> {
    shape: &'static str,
    fields: &'a [FieldDecl],
    /// The field the enclosing capture writes, if any.
    capture: Option<&'a FieldDecl>,
}

impl Scope<'_> {
    fn field_name(&self) -> &'static str {
        self.capture.map_or("_", |decl| decl.name)
    }
}

impl<'s> Compiler<'s> {
    #[must_use]
    pub fn new(symbols: &'s SymbolTable) -> Self {
        Self {
            symbols,
            slots: Vec::new(),
            names: Vec::new(),
            index: HashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// # Errors
    ///
    /// Returns the first [`GrammarError`] found while compiling or validating.
    pub fn compile<S: Shape>(mut self) -> Result<(Grammar, Analysis), GrammarError> {
        let root = self.shape_index::<S>()?;
        let shapes = self
            .slots
            .into_iter()
            .zip(&self.names)
            .map(|(slot, name)| {
                slot.ok_or_else(|| GrammarError::malformed(name, "_", "shape was never compiled"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let grammar = Grammar {
            shapes,
            names: self.names,
            symbols: self.symbols.clone(),
            root,
        };
        let analysis = Analysis::run(&grammar)?;
        Ok((grammar, analysis))
    }

    pub(crate) fn shape_index<S: Shape>(&mut self) -> Result<ShapeIndex, GrammarError> {
        let type_id = TypeId::of::<S>();
        if let Some(&index) = self.index.get(&type_id) {
            return Ok(index);
        }
        let index = ShapeIndex(self.slots.len());
        self.slots.push(None);
        self.names.push(S::name());
        self.index.insert(type_id, index);

        let mut builder = ShapeBuilder::<S>::new();
        S::grammar(&mut builder);
        let compiled = self.compile_shape::<S>(builder)?;
        self.slots[index.0] = Some(compiled);
        Ok(index)
    }

    fn compile_shape<S: Shape>(&mut self, builder: ShapeBuilder<S>) -> Result<CompiledShape, GrammarError> {
        let name = S::name();
        let ShapeBuilder {
            fields,
            rules,
            position,
            hook,
            ..
        } = builder;

        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(GrammarError::malformed(name, field.name, "field declared twice"));
            }
        }

        let body = if hook.is_some() {
            if !rules.is_empty() || !fields.is_empty() {
                return Err(GrammarError::malformed(
                    name,
                    "_",
                    "a custom shape cannot declare fields or rules",
                ));
            }
            Node::Sequence(Vec::new())
        } else {
            if rules.is_empty() {
                return Err(GrammarError::EmptyShape {
                    shape: name.to_string(),
                });
            }
            let scope = Scope {
                shape: name,
                fields: &fields,
                capture: None,
            };
            let mut nodes = rules
                .iter()
                .map(|rule| self.compile_expr(rule, &scope))
                .collect::<Result<Vec<_>, _>>()?;
            if nodes.len() == 1 {
                nodes.remove(0)
            } else {
                Node::Sequence(nodes)
            }
        };

        Ok(CompiledShape {
            name,
            body,
            fields,
            position,
            hook,
            construct: construct::<S>,
        })
    }

    fn resolve_symbol(&self, scope: &Scope<'_>, symbol: &str) -> Result<TokenKind, GrammarError> {
        self.symbols.get(symbol).ok_or_else(|| GrammarError::UnknownSymbol {
            shape: scope.shape.to_string(),
            field: scope.field_name().to_string(),
            symbol: symbol.to_string(),
        })
    }

    fn compile_expr(&mut self, expr: &Expr, scope: &Scope<'_>) -> Result<Node, GrammarError> {
        match expr {
            Expr::Literal { text, symbol } => {
                if text.is_empty() {
                    return Err(GrammarError::malformed(scope.shape, scope.field_name(), "empty literal"));
                }
                let kind = symbol
                    .as_deref()
                    .map(|symbol| self.resolve_symbol(scope, symbol))
                    .transpose()?;
                Ok(Node::Literal {
                    text: text.clone(),
                    kind,
                })
            }
            Expr::Kind(symbol) => Ok(Node::Kind(self.resolve_symbol(scope, symbol)?)),
            Expr::Shape(shape) => Ok(Node::Reference((shape.compile)(self)?)),
            Expr::Capture { field, expr } => {
                if let Some(outer) = scope.capture {
                    return Err(GrammarError::malformed(
                        scope.shape,
                        outer.name,
                        format!("capture into {field:?} nested inside another capture"),
                    ));
                }
                let (index, decl) = scope
                    .fields
                    .iter()
                    .enumerate()
                    .find(|(_, decl)| decl.name == field.as_str())
                    .ok_or_else(|| GrammarError::UnknownField {
                        shape: scope.shape.to_string(),
                        field: field.to_string(),
                    })?;
                check_capture(scope.shape, decl, expr)?;
                let inner = Scope {
                    shape: scope.shape,
                    fields: scope.fields,
                    capture: Some(decl),
                };
                Ok(Node::Capture {
                    field: FieldIndex(index),
                    child: Box::new(self.compile_expr(expr, &inner)?),
                })
            }
            Expr::Seq(exprs) | Expr::Alt(exprs) if exprs.is_empty() => Err(GrammarError::malformed(
                scope.shape,
                scope.field_name(),
                if matches!(expr, Expr::Seq(_)) {
                    "empty sequence"
                } else {
                    "empty alternation"
                },
            )),
            Expr::Seq(exprs) => {
                let mut nodes = self.compile_all(exprs, scope)?;
                Ok(if nodes.len() == 1 {
                    nodes.remove(0)
                } else {
                    Node::Sequence(nodes)
                })
            }
            Expr::Alt(exprs) => {
                let mut branches = self.compile_all(exprs, scope)?;
                Ok(if branches.len() == 1 {
                    branches.remove(0)
                } else {
                    Node::Alternation {
                        branches,
                        lookahead: None,
                    }
                })
            }
            Expr::Opt(expr) => Ok(Node::Optional(Box::new(self.compile_expr(expr, scope)?))),
            Expr::Repeat { expr, min } => {
                if *min > 1 {
                    return Err(GrammarError::malformed(
                        scope.shape,
                        scope.field_name(),
                        format!("repetition minimum must be 0 or 1, not {min}"),
                    ));
                }
                Ok(Node::Repetition {
                    child: Box::new(self.compile_expr(expr, scope)?),
                    min: *min,
                })
            }
        }
    }

    fn compile_all(&mut self, exprs: &[Expr], scope: &Scope<'_>) -> Result<Vec<Node>, GrammarError> {
        exprs.iter().map(|expr| self.compile_expr(expr, scope)).collect()
    }
}

/// A capture may only produce what its field accepts.
fn check_capture(shape: &str, decl: &FieldDecl, expr: &Expr) -> Result<(), GrammarError> {
    let mut tokens = false;
    let mut shapes: Vec<ShapeRef> = Vec::new();
    expr.produced(&mut tokens, &mut shapes);
    match &decl.sink {
        FieldSink::Tokens { .. } => {
            if let Some(nested) = shapes.first() {
                return Err(GrammarError::capture_mismatch(
                    shape,
                    decl.name,
                    format!("captures shape {} into a token field", nested.name()),
                ));
            }
        }
        FieldSink::Nested { shape: expected, .. } => {
            if tokens {
                return Err(GrammarError::capture_mismatch(
                    shape,
                    decl.name,
                    format!("captures tokens into a field holding {}", expected.name()),
                ));
            }
            if let Some(other) = shapes.iter().find(|s| *s != expected) {
                return Err(GrammarError::capture_mismatch(
                    shape,
                    decl.name,
                    format!("captures {} into a field holding {}", other.name(), expected.name()),
                ));
            }
        }
    }
    Ok(())
}

fn construct<S: Shape>() -> Box<dyn Any + Send> {
    Box::new(S::default())
}

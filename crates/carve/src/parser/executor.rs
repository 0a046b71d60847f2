//! Backtracking recursive descent over compiled [`Node`] trees.
//!
//! Every node either matches, reports [`Outcome::NoMatch`] with the stream
//! where it found it, or fails hard. Captured values are journaled and only
//! written into a shape instance once that shape has matched as a whole.

use crate::error::{ParseError, SyntaxError};
use crate::grammar::{FieldSink, HookOutcome, Node, ShapeIndex};
use crate::lexer::Token;
use crate::parser::context::{Entry, ParseContext, Value};
use std::any::Any;

pub(crate) enum Outcome {
    Matched(Vec<Value>),
    NoMatch,
}

/// Captured values ready to be written into their field.
enum Staged {
    Tokens(Vec<Token>),
    Shapes(Vec<Box<dyn Any + Send>>),
}

pub(crate) fn execute(ctx: &mut ParseContext<'_, '_>, node: &Node) -> Result<Outcome, ParseError> {
    match node {
        Node::Literal { text, kind } => {
            let token = ctx.lexer.peek(0)?;
            let kind_ok = match kind {
                Some(kind) => token.kind == *kind,
                None => !token.is_eof(),
            };
            if kind_ok && ctx.fold.text_eq(token.kind, text, &token.text) {
                Ok(Outcome::Matched(vec![Value::Token(ctx.lexer.next()?)]))
            } else {
                Ok(Outcome::NoMatch)
            }
        }
        Node::Kind(kind) => {
            if ctx.lexer.peek(0)?.kind == *kind {
                Ok(Outcome::Matched(vec![Value::Token(ctx.lexer.next()?)]))
            } else {
                Ok(Outcome::NoMatch)
            }
        }
        Node::Sequence(children) => sequence(ctx, children),
        Node::Alternation { branches, lookahead } => {
            let Some(table) = lookahead else {
                return ordered(ctx, branches, 0..branches.len());
            };
            let next = ctx.lexer.peek(0)?;
            let candidates = table.candidates(next, ctx.fold);
            match candidates.as_slice() {
                [] => Ok(Outcome::NoMatch),
                [only] => {
                    tracing::trace!(branch = only, token = %next, "lookahead selected branch");
                    execute(ctx, &branches[*only])
                }
                several => ordered(ctx, branches, several.iter().copied()),
            }
        }
        Node::Repetition { child, min } => {
            let mark = ctx.mark();
            let mut values = Vec::new();
            let mut count = 0;
            loop {
                let before = ctx.lexer.cursor();
                match execute(ctx, child)? {
                    Outcome::NoMatch => break,
                    Outcome::Matched(more) => {
                        values.extend(more);
                        count += 1;
                        if ctx.lexer.cursor() == before {
                            break;
                        }
                    }
                }
            }
            if count < *min {
                ctx.rewind(mark);
                return Ok(Outcome::NoMatch);
            }
            Ok(Outcome::Matched(values))
        }
        Node::Optional(child) => match execute(ctx, child)? {
            Outcome::NoMatch => Ok(Outcome::Matched(Vec::new())),
            matched => Ok(matched),
        },
        Node::Capture { field, child } => {
            let pos = ctx.lexer.peek(0)?.pos;
            match execute(ctx, child)? {
                Outcome::NoMatch => Ok(Outcome::NoMatch),
                Outcome::Matched(values) => {
                    if !values.is_empty() {
                        ctx.record(Entry {
                            field: *field,
                            values,
                            pos,
                        });
                    }
                    Ok(Outcome::Matched(Vec::new()))
                }
            }
        }
        Node::Reference(index) => {
            let grammar = ctx.grammar;
            let mut instance = (grammar.shape(*index).construct)();
            if run_shape(ctx, *index, &mut *instance)? {
                Ok(Outcome::Matched(vec![Value::Shape(instance)]))
            } else {
                Ok(Outcome::NoMatch)
            }
        }
    }
}

fn sequence(ctx: &mut ParseContext<'_, '_>, children: &[Node]) -> Result<Outcome, ParseError> {
    let mark = ctx.mark();
    let mut values = Vec::new();
    for child in children {
        match execute(ctx, child)? {
            Outcome::Matched(more) => values.extend(more),
            Outcome::NoMatch => {
                if ctx.lexer.cursor() == mark.cursor() {
                    ctx.rewind(mark);
                    return Ok(Outcome::NoMatch);
                }
                let found = ctx.lexer.peek(0)?.clone();
                let expected = ctx.grammar.renderer().node(child);
                ctx.rewind(mark);
                return Err(SyntaxError::unexpected(expected, &found).into());
            }
        }
    }
    Ok(Outcome::Matched(values))
}

/// Try `order` branches one after another; the first match wins.
fn ordered(
    ctx: &mut ParseContext<'_, '_>,
    branches: &[Node],
    order: impl Iterator<Item = usize>,
) -> Result<Outcome, ParseError> {
    let mark = ctx.mark();
    let mut deepest: Option<SyntaxError> = None;
    for branch in order {
        match execute(ctx, &branches[branch]) {
            Ok(Outcome::Matched(values)) => return Ok(Outcome::Matched(values)),
            Ok(Outcome::NoMatch) => {}
            Err(ParseError::Syntax(err)) => {
                tracing::trace!(branch, position = %err.position, "branch failed, backtracking");
                ctx.rewind(mark);
                if deepest
                    .as_ref()
                    .is_none_or(|best| err.position.offset >= best.position.offset)
                {
                    deepest = Some(err);
                }
            }
            Err(err) => return Err(err),
        }
    }
    match deepest {
        Some(err) => Err(err.into()),
        None => Ok(Outcome::NoMatch),
    }
}

/// Headroom left before a nested shape moves to a fresh stack segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Match shape `index` into `target`. Returns whether it matched.
pub(crate) fn run_shape(
    ctx: &mut ParseContext<'_, '_>,
    index: ShapeIndex,
    target: &mut dyn Any,
) -> Result<bool, ParseError> {
    let start = ctx.lexer.peek(0)?.pos;
    ctx.enter(start)?;
    let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || match_shape(ctx, index, target));
    ctx.leave();
    let matched = result?;
    if matched && let Some(set) = &ctx.grammar.shape(index).position {
        set(target, start);
    }
    Ok(matched)
}

fn match_shape(ctx: &mut ParseContext<'_, '_>, index: ShapeIndex, target: &mut dyn Any) -> Result<bool, ParseError> {
    let grammar = ctx.grammar;
    let shape = grammar.shape(index);

    if let Some(hook) = &shape.hook {
        let checkpoint = ctx.lexer.checkpoint();
        return match hook(target, &mut ctx.lexer)? {
            HookOutcome::Matched => Ok(true),
            HookOutcome::NotMatched => {
                ctx.lexer.restore(checkpoint);
                Ok(false)
            }
        };
    }

    let scope = ctx.scope();
    match execute(ctx, &shape.body) {
        Ok(Outcome::Matched(_)) => {}
        Ok(Outcome::NoMatch) => {
            ctx.discard(scope);
            return Ok(false);
        }
        Err(err) => {
            ctx.discard(scope);
            return Err(err);
        }
    }

    // Every capture is checked before the first write, so a rejected value
    // leaves the target as it was.
    let mut staged = Vec::new();
    for entry in ctx.take(scope) {
        let Some(decl) = shape.fields.get(entry.field.0) else {
            continue;
        };
        let fail = |msg: String| SyntaxError::invalid(entry.pos, format!("{}.{}: {msg}", shape.name, decl.name));
        let write = match &decl.sink {
            FieldSink::Tokens { check, .. } => {
                let tokens: Vec<_> = entry
                    .values
                    .into_iter()
                    .filter_map(|value| match value {
                        Value::Token(token) => Some(token),
                        Value::Shape(_) => None,
                    })
                    .collect();
                if tokens.is_empty() {
                    continue;
                }
                check(&tokens).map_err(fail)?;
                Staged::Tokens(tokens)
            }
            FieldSink::Nested { .. } => Staged::Shapes(
                entry
                    .values
                    .into_iter()
                    .filter_map(|value| match value {
                        Value::Shape(nested) => Some(nested),
                        Value::Token(_) => None,
                    })
                    .collect(),
            ),
        };
        staged.push((decl, entry.pos, write));
    }

    for (decl, pos, write) in staged {
        let applied = match (&decl.sink, write) {
            (FieldSink::Tokens { set, .. }, Staged::Tokens(tokens)) => set(target, &tokens),
            (FieldSink::Nested { set, .. }, Staged::Shapes(shapes)) => {
                shapes.into_iter().try_for_each(|nested| set(target, nested))
            }
            _ => Ok(()),
        };
        applied.map_err(|msg| SyntaxError::invalid(pos, format!("{}.{}: {msg}", shape.name, decl.name)))?;
    }
    Ok(true)
}

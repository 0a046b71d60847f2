//! # Grammar
//!
//! Shapes declare their grammar with [`Expr`] rules through a
//! [`ShapeBuilder`]. [`compile`] turns a root shape and every shape it
//! references into a [`Grammar`]: an arena of [`Node`] trees indexed by
//! [`ShapeIndex`], with recursive references resolved to the same slot.
//!
//! Compilation also runs [`Analysis`], which rejects grammars that could
//! loop forever at parse time (nullable repetitions, left recursion, shapes
//! that can never finish). With lookahead enabled, [`lookahead::resolve`]
//! then attaches a [`LookaheadTable`] to every alternation.

mod analysis;
mod compiler;
mod expr;
pub mod lookahead;
mod node;
mod shape;

pub use analysis::Analysis;
pub use compiler::{Compiler, compile};
pub use expr::{Expr, ShapeRef};
pub use lookahead::{Ambiguity, FirstSet, FirstToken, LookaheadTable};
pub use node::{FieldIndex, Grammar, Node, ShapeIndex};
pub use shape::{FieldValue, HookOutcome, NestedSlot, Parseable, Shape, ShapeBuilder};

pub(crate) use shape::FieldSink;

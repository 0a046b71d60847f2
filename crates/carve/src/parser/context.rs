use crate::error::{ParseError, SyntaxError};
use crate::grammar::{FieldIndex, Grammar};
use crate::lexer::{CaseFold, Checkpoint, PeekingLexer, Position, Token};
use std::any::Any;

/// A value produced by matching a node.
pub(crate) enum Value {
    Token(Token),
    Shape(Box<dyn Any + Send>),
}

/// A capture waiting for its shape to finish matching.
pub(crate) struct Entry {
    pub(crate) field: FieldIndex,
    pub(crate) values: Vec<Value>,
    pub(crate) pos: Position,
}

/// Stream cursor and journal length, restored together on backtrack.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Mark {
    checkpoint: Checkpoint,
    journal: usize,
}

impl Mark {
    pub(crate) const fn cursor(self) -> usize {
        self.checkpoint.cursor()
    }
}

/// State owned by one parse call.
pub(crate) struct ParseContext<'p, 'l> {
    pub(crate) grammar: &'p Grammar,
    pub(crate) lexer: PeekingLexer<'l>,
    pub(crate) fold: &'p CaseFold,
    journal: Vec<Entry>,
    depth: usize,
    max_depth: usize,
}

impl<'p, 'l> ParseContext<'p, 'l> {
    pub(crate) fn new(grammar: &'p Grammar, lexer: PeekingLexer<'l>, fold: &'p CaseFold, max_depth: usize) -> Self {
        Self {
            grammar,
            lexer,
            fold,
            journal: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    pub(crate) fn mark(&self) -> Mark {
        Mark {
            checkpoint: self.lexer.checkpoint(),
            journal: self.journal.len(),
        }
    }

    pub(crate) fn rewind(&mut self, mark: Mark) {
        self.lexer.restore(mark.checkpoint);
        self.journal.truncate(mark.journal);
    }

    pub(crate) fn record(&mut self, entry: Entry) {
        self.journal.push(entry);
    }

    /// Start of a shape's journal scope.
    pub(crate) fn scope(&self) -> usize {
        self.journal.len()
    }

    /// Remove and return every entry recorded since `scope`.
    pub(crate) fn take(&mut self, scope: usize) -> Vec<Entry> {
        self.journal.split_off(scope.min(self.journal.len()))
    }

    pub(crate) fn discard(&mut self, scope: usize) {
        self.journal.truncate(scope);
    }

    /// # Errors
    ///
    /// Fails once nesting exceeds the configured maximum.
    pub(crate) fn enter(&mut self, pos: Position) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(SyntaxError::invalid(
                pos,
                format!("maximum nesting depth of {} exceeded", self.max_depth),
            )
            .into());
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    #[cfg(test)]
    pub(crate) const fn depth(&self) -> usize {
        self.depth
    }
}

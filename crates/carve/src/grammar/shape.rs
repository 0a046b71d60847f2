//! # Shapes
//!
//! A shape is a Rust type whose grammar is declared through a
//! [`ShapeBuilder`]: the fields that captures may write, and the rules that
//! match it.
//!
//! ```rust
//! use carve::{Expr, Shape, ShapeBuilder};
//!
//! #[derive(Debug, Default)]
//! struct Select {
//!     fields: Vec<String>,
//!     table: String,
//! }
//!
//! impl Shape for Select {
//!     fn grammar(shape: &mut ShapeBuilder<Self>) {
//!         shape
//!             .field("fields", |s| &mut s.fields)
//!             .field("table", |s| &mut s.table)
//!             .rule(Expr::lit("SELECT"))
//!             .rule(Expr::separated(
//!                 Expr::capture("fields", Expr::kind("Ident")),
//!                 Expr::lit(","),
//!             ))
//!             .rule(Expr::lit("FROM"))
//!             .rule(Expr::capture("table", Expr::kind("Ident")));
//!     }
//! }
//! ```
//!
//! Field writes are deferred: values captured while matching a shape are
//! applied to the instance only once the whole shape has matched.

use crate::error::ParseError;
use crate::grammar::expr::{Expr, ShapeRef};
use crate::lexer::{PeekingLexer, Position, Token};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

/// A type that can be parsed from a token stream.
pub trait Shape: Default + Send + 'static {
    /// Declare fields and rules.
    fn grammar(shape: &mut ShapeBuilder<Self>);

    /// Name used in grammar renderings and errors.
    fn name() -> &'static str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }
}

/// A shape that matches itself by hand instead of through rules.
///
/// Declared with [`ShapeBuilder::custom`].
pub trait Parseable {
    /// Match against the stream.
    ///
    /// Return [`HookOutcome::NotMatched`] to let the grammar try something
    /// else; any tokens consumed before that are given back.
    ///
    /// # Errors
    ///
    /// An error aborts the current alternative like any other syntax error.
    fn parse(&mut self, lex: &mut PeekingLexer<'_>) -> Result<HookOutcome, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Matched,
    NotMatched,
}

/// A field that token captures can be written into.
pub trait FieldValue: Send + 'static {
    /// Apply one capture. `tokens` is never empty.
    ///
    /// # Errors
    ///
    /// Returns a description of why the text does not fit the field.
    fn assign(&mut self, tokens: &[Token]) -> Result<(), String>;

    /// Report whether [`assign`](Self::assign) would accept `tokens`
    /// without writing anything.
    ///
    /// Every capture of a shape is checked before the first one is
    /// assigned, so a rejected capture leaves the target untouched. The
    /// default accepts everything.
    ///
    /// # Errors
    ///
    /// The same description `assign` would return.
    fn check(tokens: &[Token]) -> Result<(), String>
    where
        Self: Sized,
    {
        let _ = tokens;
        Ok(())
    }
}

fn joined(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

impl FieldValue for String {
    fn assign(&mut self, tokens: &[Token]) -> Result<(), String> {
        for token in tokens {
            self.push_str(&token.text);
        }
        Ok(())
    }
}

impl FieldValue for Vec<String> {
    fn assign(&mut self, tokens: &[Token]) -> Result<(), String> {
        self.extend(tokens.iter().map(|t| t.text.to_string()));
        Ok(())
    }
}

impl FieldValue for bool {
    fn assign(&mut self, _tokens: &[Token]) -> Result<(), String> {
        *self = true;
        Ok(())
    }
}

impl FieldValue for Token {
    fn assign(&mut self, tokens: &[Token]) -> Result<(), String> {
        if let Some(last) = tokens.last() {
            *self = last.clone();
        }
        Ok(())
    }
}

impl FieldValue for Vec<Token> {
    fn assign(&mut self, tokens: &[Token]) -> Result<(), String> {
        self.extend_from_slice(tokens);
        Ok(())
    }
}

impl<T: FieldValue + Default> FieldValue for Option<T> {
    fn assign(&mut self, tokens: &[Token]) -> Result<(), String> {
        self.get_or_insert_with(T::default).assign(tokens)
    }

    fn check(tokens: &[Token]) -> Result<(), String> {
        T::check(tokens)
    }
}

fn parse_joined<T>(tokens: &[Token], name: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let text = joined(tokens);
    text.parse().map_err(|err| format!("invalid {name} {text:?}: {err}"))
}

macro_rules! parsed_field {
    ($($ty:ty),* $(,)?) => {$(
        impl FieldValue for $ty {
            fn assign(&mut self, tokens: &[Token]) -> Result<(), String> {
                *self = parse_joined(tokens, stringify!($ty))?;
                Ok(())
            }

            fn check(tokens: &[Token]) -> Result<(), String> {
                parse_joined::<$ty>(tokens, stringify!($ty)).map(drop)
            }
        }

        impl FieldValue for Vec<$ty> {
            fn assign(&mut self, tokens: &[Token]) -> Result<(), String> {
                for token in tokens {
                    let mut value = <$ty>::default();
                    value.assign(std::slice::from_ref(token))?;
                    self.push(value);
                }
                Ok(())
            }

            fn check(tokens: &[Token]) -> Result<(), String> {
                tokens
                    .iter()
                    .try_for_each(|token| <$ty>::check(std::slice::from_ref(token)))
            }
        }
    )*};
}

parsed_field!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char);

/// A field that holds a nested shape `N`.
pub trait NestedSlot<N: Shape>: Send + 'static {
    fn put(&mut self, value: N);
}

impl<N: Shape> NestedSlot<N> for N {
    fn put(&mut self, value: N) {
        *self = value;
    }
}

impl<N: Shape> NestedSlot<N> for Box<N> {
    fn put(&mut self, value: N) {
        **self = value;
    }
}

impl<N: Shape> NestedSlot<N> for Option<N> {
    fn put(&mut self, value: N) {
        *self = Some(value);
    }
}

impl<N: Shape> NestedSlot<N> for Option<Box<N>> {
    fn put(&mut self, value: N) {
        *self = Some(Box::new(value));
    }
}

impl<N: Shape> NestedSlot<N> for Vec<N> {
    fn put(&mut self, value: N) {
        self.push(value);
    }
}

pub(crate) type TokenSetter = Arc<dyn Fn(&mut dyn Any, &[Token]) -> Result<(), String> + Send + Sync>;
pub(crate) type TokenCheck = Arc<dyn Fn(&[Token]) -> Result<(), String> + Send + Sync>;
pub(crate) type ShapeSetter =
    Arc<dyn Fn(&mut dyn Any, Box<dyn Any + Send>) -> Result<(), String> + Send + Sync>;
pub(crate) type PositionSetter = Arc<dyn Fn(&mut dyn Any, Position) + Send + Sync>;
pub(crate) type HookFn =
    Arc<dyn Fn(&mut dyn Any, &mut PeekingLexer<'_>) -> Result<HookOutcome, ParseError> + Send + Sync>;

/// Where a field's captures go.
#[derive(Clone)]
pub(crate) enum FieldSink {
    Tokens { set: TokenSetter, check: TokenCheck },
    Nested { shape: ShapeRef, set: ShapeSetter },
}

#[derive(Clone)]
pub(crate) struct FieldDecl {
    pub(crate) name: &'static str,
    pub(crate) sink: FieldSink,
}

fn wrong_target<S: Shape>() -> String {
    format!("target is not a {}", S::name())
}

/// Declares the fields and rules of shape `S`.
pub struct ShapeBuilder<S: Shape> {
    pub(crate) fields: Vec<FieldDecl>,
    pub(crate) rules: Vec<Expr>,
    pub(crate) position: Option<PositionSetter>,
    pub(crate) hook: Option<HookFn>,
    _shape: PhantomData<fn() -> S>,
}

impl<S: Shape> ShapeBuilder<S> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            rules: Vec::new(),
            position: None,
            hook: None,
            _shape: PhantomData,
        }
    }

    /// Declare a field for token captures.
    pub fn field<F, A>(&mut self, name: &'static str, accessor: A) -> &mut Self
    where
        F: FieldValue,
        A: Fn(&mut S) -> &mut F + Send + Sync + 'static,
    {
        let set: TokenSetter = Arc::new(move |target: &mut dyn Any, tokens: &[Token]| {
            let target = target.downcast_mut::<S>().ok_or_else(wrong_target::<S>)?;
            accessor(target).assign(tokens)
        });
        self.fields.push(FieldDecl {
            name,
            sink: FieldSink::Tokens {
                set,
                check: Arc::new(F::check),
            },
        });
        self
    }

    /// Declare a field holding nested shape `N`.
    pub fn nested<N, F, A>(&mut self, name: &'static str, accessor: A) -> &mut Self
    where
        N: Shape,
        F: NestedSlot<N>,
        A: Fn(&mut S) -> &mut F + Send + Sync + 'static,
    {
        let set: ShapeSetter = Arc::new(move |target: &mut dyn Any, value: Box<dyn Any + Send>| {
            let target = target.downcast_mut::<S>().ok_or_else(wrong_target::<S>)?;
            let value = value
                .downcast::<N>()
                .map_err(|_| format!("captured value is not a {}", N::name()))?;
            accessor(target).put(*value);
            Ok(())
        });
        self.fields.push(FieldDecl {
            name,
            sink: FieldSink::Nested {
                shape: ShapeRef::of::<N>(),
                set,
            },
        });
        self
    }

    /// Append a rule; a shape matches its rules in order.
    pub fn rule(&mut self, expr: Expr) -> &mut Self {
        self.rules.push(expr);
        self
    }

    /// Record where the shape's match started.
    pub fn position<A>(&mut self, accessor: A) -> &mut Self
    where
        A: Fn(&mut S) -> &mut Position + Send + Sync + 'static,
    {
        self.position = Some(Arc::new(move |target: &mut dyn Any, pos: Position| {
            if let Some(target) = target.downcast_mut::<S>() {
                *accessor(target) = pos;
            }
        }));
        self
    }

    /// Match the shape with its [`Parseable`] implementation.
    pub fn custom(&mut self) -> &mut Self
    where
        S: Parseable,
    {
        self.hook = Some(Arc::new(|target: &mut dyn Any, lex: &mut PeekingLexer<'_>| {
            match target.downcast_mut::<S>() {
                Some(target) => target.parse(lex),
                None => Err(ParseError::ShapeMismatch { expected: S::name() }),
            }
        }));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn tokens(texts: &[&str]) -> Vec<Token> {
        texts
            .iter()
            .map(|t| Token::new(TokenKind(-2), *t, Position::default()))
            .collect()
    }

    #[derive(Debug, Default)]
    struct Leaf;

    impl Shape for Leaf {
        fn grammar(shape: &mut ShapeBuilder<Self>) {
            shape.rule(Expr::lit("leaf"));
        }
    }

    #[derive(Debug, Default)]
    struct Holder {
        name: String,
        count: Option<u32>,
        flags: Vec<i64>,
        leaves: Vec<Leaf>,
    }

    impl Shape for Holder {
        fn grammar(shape: &mut ShapeBuilder<Self>) {
            shape
                .field("name", |h| &mut h.name)
                .field("count", |h| &mut h.count)
                .field("flags", |h| &mut h.flags)
                .nested("leaves", |h| &mut h.leaves);
        }
    }

    #[test]
    fn test_default_name_strips_path() {
        assert_eq!(Holder::name(), "Holder");
    }

    #[test]
    fn test_scalar_assignment() {
        let mut s = String::new();
        s.assign(&tokens(&["a", "b"])).unwrap();
        assert_eq!(s, "ab");

        let mut n = 0i64;
        n.assign(&tokens(&["-", "12"])).unwrap();
        assert_eq!(n, -12);
        assert!(n.assign(&tokens(&["x"])).unwrap_err().contains("invalid i64"));

        let mut flag = false;
        flag.assign(&tokens(&["yes"])).unwrap();
        assert!(flag);

        let mut list: Vec<u8> = Vec::new();
        list.assign(&tokens(&["1", "2"])).unwrap();
        assert_eq!(list, [1, 2]);
    }

    #[test]
    fn test_check_does_not_write() {
        assert!(u8::check(&tokens(&["200"])).is_ok());
        assert!(u8::check(&tokens(&["300"])).unwrap_err().contains("invalid u8"));
        assert!(<Vec<u8>>::check(&tokens(&["1", "x"])).is_err());
        assert!(<Option<i32>>::check(&tokens(&["-4"])).is_ok());
        assert!(String::check(&tokens(&["anything"])).is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let mut builder = ShapeBuilder::<Holder>::new();
        Holder::grammar(&mut builder);
        assert_eq!(builder.fields.len(), 4);

        let mut holder = Holder::default();
        for decl in &builder.fields {
            match (&decl.sink, decl.name) {
                (FieldSink::Tokens { set, .. }, "count") => set(&mut holder, &tokens(&["7"])).unwrap(),
                (FieldSink::Tokens { set, .. }, _) => set(&mut holder, &tokens(&["3"])).unwrap(),
                (FieldSink::Nested { shape, set }, _) => {
                    assert_eq!(shape.name(), "Leaf");
                    set(&mut holder, Box::new(Leaf)).unwrap();
                }
            }
        }
        assert_eq!(holder.name, "3");
        assert_eq!(holder.count, Some(7));
        assert_eq!(holder.flags, [3]);
        assert_eq!(holder.leaves.len(), 1);
    }

    #[test]
    fn test_setter_rejects_wrong_target() {
        let mut builder = ShapeBuilder::<Holder>::new();
        Holder::grammar(&mut builder);
        let FieldSink::Tokens { set, .. } = &builder.fields[0].sink else {
            panic!("expected a token field");
        };
        let mut other = 0u8;
        assert!(set(&mut other, &tokens(&["x"])).is_err());
    }
}

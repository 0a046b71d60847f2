//! Arithmetic shapes shared by several test files
#![allow(dead_code)]

use carve::{Expr, Parser, ParserConfig, Shape, ShapeBuilder};

/// `Product { ("+" | "-") Product }`
#[derive(Debug, Default)]
pub struct Sum {
    pub first: Product,
    pub rest: Vec<SumTail>,
}

#[derive(Debug, Default)]
pub struct SumTail {
    pub op: String,
    pub operand: Product,
}

/// `Atom { ("*" | "/") Atom }`
#[derive(Debug, Default)]
pub struct Product {
    pub first: Atom,
    pub rest: Vec<ProductTail>,
}

#[derive(Debug, Default)]
pub struct ProductTail {
    pub op: String,
    pub operand: Atom,
}

/// `Int | "(" Sum ")"`
#[derive(Debug, Default)]
pub struct Atom {
    pub number: Option<i64>,
    pub group: Option<Box<Sum>>,
}

impl Shape for Sum {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .nested("first", |s| &mut s.first)
            .nested("rest", |s| &mut s.rest)
            .rule(Expr::capture("first", Expr::shape::<Product>()))
            .rule(Expr::star(Expr::capture("rest", Expr::shape::<SumTail>())));
    }
}

impl Shape for SumTail {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .field("op", |t| &mut t.op)
            .nested("operand", |t| &mut t.operand)
            .rule(Expr::capture("op", Expr::alt([Expr::lit("+"), Expr::lit("-")])))
            .rule(Expr::capture("operand", Expr::shape::<Product>()));
    }
}

impl Shape for Product {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .nested("first", |p| &mut p.first)
            .nested("rest", |p| &mut p.rest)
            .rule(Expr::capture("first", Expr::shape::<Atom>()))
            .rule(Expr::star(Expr::capture("rest", Expr::shape::<ProductTail>())));
    }
}

impl Shape for ProductTail {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .field("op", |t| &mut t.op)
            .nested("operand", |t| &mut t.operand)
            .rule(Expr::capture("op", Expr::alt([Expr::lit("*"), Expr::lit("/")])))
            .rule(Expr::capture("operand", Expr::shape::<Atom>()));
    }
}

impl Shape for Atom {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .field("number", |a| &mut a.number)
            .nested("group", |a| &mut a.group)
            .rule(Expr::alt([
                Expr::capture("number", Expr::kind("Int")),
                Expr::seq([
                    Expr::lit("("),
                    Expr::capture("group", Expr::shape::<Sum>()),
                    Expr::lit(")"),
                ]),
            ]));
    }
}

impl Sum {
    pub fn eval(&self) -> i64 {
        self.rest.iter().fold(self.first.eval(), |acc, tail| match tail.op.as_str() {
            "-" => acc.wrapping_sub(tail.operand.eval()),
            _ => acc.wrapping_add(tail.operand.eval()),
        })
    }
}

impl Product {
    pub fn eval(&self) -> i64 {
        self.rest.iter().fold(self.first.eval(), |acc, tail| match tail.op.as_str() {
            "/" => acc.checked_div(tail.operand.eval()).unwrap_or(0),
            _ => acc.wrapping_mul(tail.operand.eval()),
        })
    }
}

impl Atom {
    pub fn eval(&self) -> i64 {
        match (&self.number, &self.group) {
            (Some(n), _) => *n,
            (None, Some(group)) => group.eval(),
            (None, None) => 0,
        }
    }
}

pub fn arithmetic(lookahead: bool) -> Parser<Sum> {
    Parser::build(ParserConfig::default().lookahead(lookahead)).expect("arithmetic grammar builds")
}

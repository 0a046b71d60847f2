#![no_main]
use carve::{Expr, Parser, ParserConfig, Shape, ShapeBuilder};
use libfuzzer_sys::fuzz_target;
use std::sync::LazyLock;

#[derive(Debug, Default)]
struct Item {
    name: Option<String>,
    number: Option<i64>,
    children: Vec<Item>,
}

impl Shape for Item {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .field("name", |i| &mut i.name)
            .field("number", |i| &mut i.number)
            .nested("children", |i| &mut i.children)
            .rule(Expr::alt([
                Expr::capture("name", Expr::kind("Ident")),
                Expr::capture("number", Expr::kind("Int")),
                Expr::seq([
                    Expr::lit("("),
                    Expr::star(Expr::capture("children", Expr::shape::<Item>())),
                    Expr::lit(")"),
                ]),
            ]));
    }
}

static PLAIN: LazyLock<Parser<Item>> =
    LazyLock::new(|| Parser::build(ParserConfig::default().max_depth(64)).expect("grammar builds"));
static INDEXED: LazyLock<Parser<Item>> =
    LazyLock::new(|| Parser::build(ParserConfig::default().lookahead(true).max_depth(64)).expect("grammar builds"));

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    // Parsing must never panic, and lookahead must not change the outcome.
    let plain = PLAIN.parse_str(input).is_ok();
    let indexed = INDEXED.parse_str(input).is_ok();
    assert_eq!(plain, indexed);
});

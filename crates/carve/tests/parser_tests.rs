//! Tests for parse-time behavior: backtracking, custom hooks, limits

use carve::lexer::{Definition, PeekingLexer, TextLexer};
use carve::{
    Expr, HookOutcome, ParseError, Parseable, Parser, ParserConfig, Position, Shape, ShapeBuilder, SyntaxError,
};

#[derive(Debug, Default)]
struct Statement {
    items: Vec<String>,
}

impl Shape for Statement {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape.field("items", |s| &mut s.items).rule(Expr::alt([
            Expr::seq([Expr::capture("items", Expr::kind("Ident")), Expr::lit(";")]),
            Expr::seq([
                Expr::capture("items", Expr::kind("Ident")),
                Expr::capture("items", Expr::kind("Ident")),
                Expr::lit("."),
            ]),
        ]));
    }
}

#[test]
fn test_rolled_back_branch_leaves_no_writes() {
    let parser = Parser::<Statement>::build(ParserConfig::default()).unwrap();
    assert_eq!(parser.parse_str("a b .").unwrap().items, ["a", "b"]);
    assert_eq!(parser.parse_str("a ;").unwrap().items, ["a"]);
}

#[test]
fn test_failed_parse_reports_deepest_branch() {
    let parser = Parser::<Statement>::build(ParserConfig::default()).unwrap();
    let err = parser.parse_str("a b ;").unwrap_err();
    let syntax = err.as_syntax().unwrap();
    assert_eq!(syntax.position.column, 5);
    assert_eq!(syntax.expected.as_deref(), Some("\".\""));
}

#[derive(Debug, Default)]
struct Block {
    entries: Vec<Entry>,
}

#[derive(Debug, Default, PartialEq)]
struct Entry {
    key: String,
    value: i64,
}

impl Shape for Block {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .nested("entries", |b| &mut b.entries)
            .rule(Expr::lit("{"))
            .rule(Expr::star(Expr::capture("entries", Expr::shape::<Entry>())))
            .rule(Expr::lit("}"));
    }
}

impl Shape for Entry {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .field("key", |e| &mut e.key)
            .field("value", |e| &mut e.value)
            .rule(Expr::capture("key", Expr::kind("Ident")))
            .rule(Expr::lit("="))
            .rule(Expr::capture("value", Expr::kind("Int")))
            .rule(Expr::lit(";"));
    }
}

#[test]
fn test_nested_shapes_collected() {
    let parser = Parser::<Block>::build(ParserConfig::default()).unwrap();
    let block = parser.parse_str("{ a = 1; b = 2; }").unwrap();
    assert_eq!(
        block.entries,
        [
            Entry {
                key: "a".into(),
                value: 1
            },
            Entry {
                key: "b".into(),
                value: 2
            }
        ]
    );
}

#[test]
fn test_partial_repetition_is_not_discarded() {
    let parser = Parser::<Block>::build(ParserConfig::default()).unwrap();
    let err = parser.parse_str("{ a = 1; b = }").unwrap_err();
    let syntax = err.as_syntax().unwrap();
    assert_eq!(syntax.found.as_deref(), Some("\"}\""));
    assert_eq!(syntax.expected.as_deref(), Some("@<int>"));
}

#[derive(Debug, Default)]
struct Level {
    name: String,
    tags: Vec<String>,
    level: u8,
}

impl Shape for Level {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .field("name", |l| &mut l.name)
            .field("tags", |l| &mut l.tags)
            .field("level", |l| &mut l.level)
            .rule(Expr::capture("name", Expr::kind("Ident")))
            .rule(Expr::star(Expr::capture("tags", Expr::kind("String"))))
            .rule(Expr::capture("level", Expr::kind("Int")));
    }
}

#[test]
fn test_rejected_value_leaves_target_untouched() {
    let parser = Parser::<Level>::build(ParserConfig::default()).unwrap();
    let mut level = Level {
        name: "keep".into(),
        tags: vec!["old".into()],
        level: 3,
    };
    let err = parser.parse_into("volume \"loud\" 300", &mut level).unwrap_err();
    let syntax = err.as_syntax().unwrap();
    assert!(syntax.message.starts_with("Level.level: invalid u8"));
    assert_eq!(syntax.position.column, 15);
    assert_eq!(level.name, "keep");
    assert_eq!(level.tags, ["old"]);
    assert_eq!(level.level, 3);

    parser.parse_into("volume 11", &mut level).unwrap();
    assert_eq!(level.name, "keepvolume");
    assert_eq!(level.level, 11);
}

#[test]
fn test_parse_into_appends() {
    let parser = Parser::<Block>::build(ParserConfig::default()).unwrap();
    let mut block = Block::default();
    parser.parse_into("{ a = 1; }", &mut block).unwrap();
    parser.parse_into("{ b = 2; }", &mut block).unwrap();
    assert_eq!(block.entries.len(), 2);
    assert_eq!(block.entries[1].key, "b");
}

#[derive(Debug, Default)]
struct Nest {
    inner: Option<Box<Nest>>,
}

impl Shape for Nest {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .nested("inner", |n| &mut n.inner)
            .rule(Expr::lit("("))
            .rule(Expr::opt(Expr::capture("inner", Expr::shape::<Nest>())))
            .rule(Expr::lit(")"));
    }
}

impl Nest {
    fn depth(&self) -> usize {
        1 + self.inner.as_ref().map_or(0, |inner| inner.depth())
    }
}

#[test]
fn test_depth_limit() {
    let parser = Parser::<Nest>::build(ParserConfig::default().max_depth(8)).unwrap();
    let ok = format!("{}{}", "(".repeat(8), ")".repeat(8));
    assert_eq!(parser.parse_str(&ok).unwrap().depth(), 8);

    let deep = format!("{}{}", "(".repeat(20), ")".repeat(20));
    let err = parser.parse_str(&deep).unwrap_err();
    assert_eq!(err.as_syntax().unwrap().message, "maximum nesting depth of 8 exceeded");
}

#[test]
fn test_default_depth_limit_stops_runaway_input() {
    let parser = Parser::<Nest>::build(ParserConfig::default()).unwrap();
    let deep = "(".repeat(5000);
    let message = parser.parse_str(&deep).unwrap_err().to_string();
    assert!(message.ends_with("maximum nesting depth of 1024 exceeded"));
}

#[test]
fn test_deep_nesting_within_default_limit() {
    let parser = Parser::<Nest>::build(ParserConfig::default()).unwrap();
    let levels = 1000;
    let input = format!("{}{}", "(".repeat(levels), ")".repeat(levels));
    assert_eq!(parser.parse_str(&input).unwrap().depth(), levels);
}

#[derive(Debug, Default)]
struct Marked {
    pos: Position,
    name: String,
    tail: Option<Box<Marked>>,
}

impl Shape for Marked {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .position(|m| &mut m.pos)
            .field("name", |m| &mut m.name)
            .nested("tail", |m| &mut m.tail)
            .rule(Expr::capture("name", Expr::kind("Ident")))
            .rule(Expr::opt(Expr::capture("tail", Expr::shape::<Marked>())));
    }
}

#[test]
fn test_position_recorded() {
    let parser = Parser::<Marked>::build(ParserConfig::default()).unwrap();
    let marked = parser.parse_str("  first\n second").unwrap();
    assert_eq!(marked.pos, Position::new(2, 1, 3));
    let tail = marked.tail.unwrap();
    assert_eq!(tail.name, "second");
    assert_eq!(tail.pos, Position::new(9, 2, 2));
}

/// A duration literal such as `250 ms`, matched by hand.
#[derive(Debug, Default, PartialEq)]
struct Duration {
    millis: u64,
}

impl Shape for Duration {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape.custom();
    }
}

impl Parseable for Duration {
    fn parse(&mut self, lex: &mut PeekingLexer<'_>) -> Result<HookOutcome, ParseError> {
        if lex.peek(0)?.kind != TextLexer::INT {
            return Ok(HookOutcome::NotMatched);
        }
        let amount = lex.next()?;
        let value: u64 = amount
            .text
            .parse()
            .map_err(|_| SyntaxError::invalid(amount.pos, "duration out of range"))?;
        let unit = lex.next()?;
        self.millis = match unit.text.as_str() {
            "ms" => value,
            "s" => value.saturating_mul(1000),
            _ => return Err(SyntaxError::unexpected("a duration unit", &unit).into()),
        };
        Ok(HookOutcome::Matched)
    }
}

#[derive(Debug, Default)]
struct Timeout {
    name: String,
    after: Duration,
    never: bool,
}

impl Shape for Timeout {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .field("name", |t| &mut t.name)
            .nested("after", |t| &mut t.after)
            .field("never", |t| &mut t.never)
            .rule(Expr::lit("timeout"))
            .rule(Expr::capture("name", Expr::kind("Ident")))
            .rule(Expr::alt([
                Expr::capture("after", Expr::shape::<Duration>()),
                Expr::capture("never", Expr::lit("never")),
            ]));
    }
}

#[test]
fn test_custom_hook_inside_grammar() {
    let parser = Parser::<Timeout>::build(ParserConfig::default()).unwrap();
    let timeout = parser.parse_str("timeout read 2 s").unwrap();
    assert_eq!(timeout.name, "read");
    assert_eq!(timeout.after, Duration { millis: 2000 });

    let never = parser.parse_str("timeout write never").unwrap();
    assert!(never.never);
    assert_eq!(never.after, Duration::default());
}

#[test]
fn test_custom_hook_error_propagates() {
    let parser = Parser::<Timeout>::build(ParserConfig::default()).unwrap();
    let err = parser.parse_str("timeout read 2 weeks").unwrap_err();
    assert_eq!(err.to_string(), "1:16: expected a duration unit but got \"weeks\"");
}

/// Consumes a run of identifiers and only matches when it ends in `!`.
#[derive(Debug, Default)]
struct Shout {
    words: usize,
}

impl Shape for Shout {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape.custom();
    }
}

impl Parseable for Shout {
    fn parse(&mut self, lex: &mut PeekingLexer<'_>) -> Result<HookOutcome, ParseError> {
        let mut words = 0;
        while lex.peek(0)?.kind == TextLexer::IDENT {
            lex.next()?;
            words += 1;
        }
        if lex.peek(0)?.text != "!" {
            return Ok(HookOutcome::NotMatched);
        }
        lex.next()?;
        self.words = words;
        Ok(HookOutcome::Matched)
    }
}

#[derive(Debug, Default)]
struct Utterance {
    shout: Option<Shout>,
    words: Vec<String>,
}

impl Shape for Utterance {
    fn grammar(shape: &mut ShapeBuilder<Self>) {
        shape
            .nested("shout", |u| &mut u.shout)
            .field("words", |u| &mut u.words)
            .rule(Expr::alt([
                Expr::capture("shout", Expr::shape::<Shout>()),
                Expr::plus(Expr::capture("words", Expr::kind("Ident"))),
            ]));
    }
}

#[test]
fn test_unmatched_hook_gives_tokens_back() {
    for lookahead in [false, true] {
        let parser = Parser::<Utterance>::build(ParserConfig::default().lookahead(lookahead)).unwrap();

        let plain = parser.parse_str("hey you there").unwrap();
        assert!(plain.shout.is_none());
        assert_eq!(plain.words, ["hey", "you", "there"]);

        let loud = parser.parse_str("hey you !").unwrap();
        assert_eq!(loud.shout.map(|s| s.words), Some(2));
        assert!(loud.words.is_empty());
    }
}

#[test]
fn test_custom_root() {
    let parser = Parser::<Duration>::build(ParserConfig::default()).unwrap();
    assert_eq!(parser.to_string(), "Duration = <custom> .");
    assert_eq!(parser.parse_str("15 ms").unwrap().millis, 15);

    let err = parser.parse_str("soon").unwrap_err();
    assert_eq!(err.as_syntax().unwrap().message, "invalid syntax");

    let err = parser.parse_str("1 s later").unwrap_err();
    assert_eq!(err.as_syntax().unwrap().message, "unexpected token \"later\"");
}

#[test]
fn test_shape_mismatch() {
    let parser = Parser::<Timeout>::build(ParserConfig::default()).unwrap();
    let mut wrong = Duration::default();
    let lexer = parser.definition().lex("timeout x never").unwrap();
    let err = parser.parse_stream(lexer, &mut wrong).unwrap_err();
    assert_eq!(err.to_string(), "must parse into a value of type Timeout");
}

#[test]
fn test_lex_error_aborts_backtracking() {
    let parser = Parser::<Statement>::build(ParserConfig::default()).unwrap();
    let err = parser.parse_str("a \"open").unwrap_err();
    assert!(matches!(err, ParseError::Stream(_)));
    assert!(err.position().is_some());
}

//! Structural matching: the same grammar machinery matches over lists,
//! maps and primitives instead of text.
//!
//! Run with: cargo run --example structural

use seedling::{GrammarBuilder, Matcher, PExpr, Value};

fn main() {
    // point  = {x: int, y: int, ...}
    // points = [point+]
    let int = || PExpr::range(i64::MIN, i64::MAX);
    let grammar = GrammarBuilder::new()
        .rule(
            "point",
            PExpr::obj([("x", int()), ("y", int())], true),
        )
        .rule(
            "points",
            PExpr::arr(PExpr::plus(PExpr::apply("point"))),
        )
        .default_start_rule("points")
        .build()
        .expect("grammar is well-formed");

    let matcher = Matcher::new(&grammar);

    let good = Value::List(vec![
        Value::map([("x", Value::Int(1)), ("y", Value::Int(2))]),
        Value::map([
            ("x", Value::Int(3)),
            ("y", Value::Int(4)),
            ("label", Value::str("home")),
        ]),
    ]);
    let result = matcher.match_value(&good).expect("no grammar errors");
    println!("two points:     succeeded = {}", result.succeeded());

    let bad = Value::List(vec![Value::map([("x", Value::Int(1))])]);
    let result = matcher.match_value(&bad).expect("no grammar errors");
    println!("missing y:      succeeded = {}", result.succeeded());

    let not_a_list = Value::str("points");
    let result = matcher.match_value(&not_a_list).expect("no grammar errors");
    println!("not a list:     succeeded = {}", result.succeeded());
}

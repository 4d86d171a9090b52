//! Left-recursive arithmetic: subtraction parses left-associatively via
//! seed-growing, with implicit whitespace skipping in syntactic rules.
//!
//! Run with: cargo run --example arithmetic

use seedling::{GrammarBuilder, Matcher, PExpr};

fn main() {
    // num  = digit+           (lexical: no spaces inside a number)
    // Diff = Expr "-" num     (syntactic: spaces skipped between parts)
    // Expr = Diff | num
    let grammar = GrammarBuilder::new()
        .rule("num", PExpr::plus(PExpr::apply("digit")))
        .rule(
            "Diff",
            PExpr::seq([
                PExpr::apply("Expr"),
                PExpr::literal("-"),
                PExpr::apply("num"),
            ]),
        )
        .rule(
            "Expr",
            PExpr::alt([PExpr::apply("Diff"), PExpr::apply("num")]),
        )
        .default_start_rule("Expr")
        .build()
        .expect("grammar is well-formed");

    let matcher = Matcher::new(&grammar);

    for input in ["7", "10-3", "100 - 20 - 3", "1-"] {
        match matcher.match_str(input).expect("no grammar errors") {
            result if result.succeeded() => {
                println!("{input:>12}  =>  {}", result.root().unwrap());
            }
            result => {
                println!("{input:>12}  =>  no match ({})", result.failure_message().unwrap());
            }
        }
    }

    // The trace shows the seed being grown at position 0.
    let (_, trace) = matcher.trace_str("1-2-3").expect("no grammar errors");
    println!("\ntrace of \"1-2-3\":\n{trace}");
}

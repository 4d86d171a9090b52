#![no_main]
use libfuzzer_sys::fuzz_target;
use seedling::{GrammarBuilder, Matcher, MatcherConfig, PExpr};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // A grammar touching every interesting corner: left recursion,
    // negation, iteration, syntactic whitespace.
    let Ok(grammar) = GrammarBuilder::new()
        .rule("num", PExpr::plus(PExpr::apply("digit")))
        .rule("word", PExpr::plus(PExpr::apply("letter")))
        .rule(
            "atom",
            PExpr::alt([PExpr::apply("num"), PExpr::apply("word")]),
        )
        .rule(
            "Chain",
            PExpr::seq([
                PExpr::apply("Expr"),
                PExpr::literal("-"),
                PExpr::apply("atom"),
            ]),
        )
        .rule(
            "Expr",
            PExpr::alt([PExpr::apply("Chain"), PExpr::apply("atom")]),
        )
        .default_start_rule("Expr")
        .build()
    else {
        return;
    };

    let matcher = Matcher::with_config(&grammar, MatcherConfig { max_depth: 256 });

    // Matching must never panic; a failed parse and a depth-limit error
    // are both fine outcomes.
    let _ = matcher.match_str(input);
    let _ = matcher.trace_str(input);
});

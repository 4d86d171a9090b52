//! Tests for the structured evaluation trace.

use seedling::{GrammarBuilder, Matcher, PExpr, TraceEntry};

fn collect<'t>(trace: &'t TraceEntry, pred: &dyn Fn(&TraceEntry) -> bool) -> Vec<&'t TraceEntry> {
    let mut found = Vec::new();
    let mut stack = vec![trace];
    while let Some(entry) = stack.pop() {
        if pred(entry) {
            found.push(entry);
        }
        stack.extend(entry.children.iter());
    }
    found
}

#[test]
fn test_trace_mirrors_evaluation() {
    let grammar = GrammarBuilder::new()
        .rule(
            "start",
            PExpr::seq([PExpr::literal("a"), PExpr::literal("b")]),
        )
        .default_start_rule("start")
        .build()
        .expect("Failed to build grammar");
    let matcher = Matcher::new(&grammar);

    let (result, trace) = matcher.trace_str("ab").unwrap();
    assert!(result.succeeded());
    assert_eq!(trace.descriptor, "start");
    assert!(trace.succeeded);
    assert_eq!(trace.pos, 0);

    let literals = collect(&trace, &|e| e.descriptor == "\"b\"");
    assert_eq!(literals.len(), 1);
    assert_eq!(literals[0].pos, 1);
    assert!(literals[0].succeeded);
}

#[test]
fn test_trace_records_failures() {
    let grammar = GrammarBuilder::new()
        .rule(
            "start",
            PExpr::alt([PExpr::literal("x"), PExpr::literal("y")]),
        )
        .default_start_rule("start")
        .build()
        .unwrap();

    let (result, trace) = Matcher::new(&grammar).trace_str("z").unwrap();
    assert!(!result.succeeded());
    assert!(!trace.succeeded);

    // Both failed alternatives appear.
    assert_eq!(collect(&trace, &|e| !e.succeeded && e.descriptor.starts_with('"')).len(), 2);
}

#[test]
fn test_memo_replay_reproduces_stored_trace() {
    // dup is applied twice at position 0: once evaluated, once replayed.
    let grammar = GrammarBuilder::new()
        .rule("dup", PExpr::literal("ab"))
        .rule(
            "start",
            PExpr::seq([
                PExpr::lookahead(PExpr::apply("dup")),
                PExpr::apply("dup"),
            ]),
        )
        .default_start_rule("start")
        .build()
        .unwrap();

    let (result, trace) = Matcher::new(&grammar).trace_str("ab").unwrap();
    assert!(result.succeeded());

    let replayed = collect(&trace, &|e| e.descriptor == "dup" && e.replayed_from_memo);
    assert_eq!(replayed.len(), 1, "second application replays the memo");
    // The replayed wrapper reproduces the originally stored subtree.
    assert_eq!(replayed[0].children.len(), 1);
    assert_eq!(replayed[0].children[0].descriptor, "dup");
    assert!(!replayed[0].children[0].replayed_from_memo);

    let evaluated = collect(&trace, &|e| e.descriptor == "dup" && !e.replayed_from_memo);
    assert!(!evaluated.is_empty());
}

#[test]
fn test_left_recursion_head_is_marked() {
    let grammar = GrammarBuilder::new()
        .rule("num", PExpr::plus(PExpr::apply("digit")))
        .rule(
            "sub",
            PExpr::seq([
                PExpr::apply("expr"),
                PExpr::literal("-"),
                PExpr::apply("num"),
            ]),
        )
        .rule(
            "expr",
            PExpr::alt([PExpr::apply("sub"), PExpr::apply("num")]),
        )
        .default_start_rule("expr")
        .build()
        .unwrap();

    let (result, trace) = Matcher::new(&grammar).trace_str("1-2").unwrap();
    assert!(result.succeeded());

    let heads = collect(&trace, &|e| e.left_recursive);
    assert_eq!(heads.len(), 1);
    assert_eq!(heads[0].descriptor, "expr");
    assert_eq!(heads[0].pos, 0);

    // The head's children are the seed parse and the successful grow
    // iterations; the final no-progress attempt is dropped.
    assert!(heads[0].children.iter().all(|c| c.succeeded));
}

#[test]
fn test_trace_available_for_value_inputs() {
    let grammar = GrammarBuilder::new()
        .rule(
            "pair",
            PExpr::arr(PExpr::seq([
                PExpr::terminal(1i64),
                PExpr::terminal(2i64),
            ])),
        )
        .build()
        .unwrap();

    let input = seedling::Value::from(vec![1i64, 2]);
    let (result, trace) = Matcher::new(&grammar)
        .trace_value_rule(&input, "pair")
        .unwrap();
    assert!(result.succeeded());
    assert_eq!(trace.descriptor, "pair");
    assert_eq!(collect(&trace, &|e| e.descriptor == "1").len(), 1);
}

#[test]
fn test_trace_rendering_is_indented() {
    let grammar = GrammarBuilder::new()
        .rule("start", PExpr::literal("a"))
        .default_start_rule("start")
        .build()
        .unwrap();

    let (_, trace) = Matcher::new(&grammar).trace_str("a").unwrap();
    let rendered = trace.to_string();
    assert!(rendered.starts_with("✓ start @ 0"));
    assert!(rendered.contains("\n  ✓ \"a\" @ 0"));
}

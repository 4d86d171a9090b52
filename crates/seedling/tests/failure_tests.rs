//! Tests for failure reporting: rightmost position, expected sets,
//! suppression scopes.

use seedling::{Expected, GrammarBuilder, Matcher, PExpr};

#[test]
fn test_negative_lookahead_rejects_keywords() {
    // Ident = ~Keyword letter+ ; Keyword = "if" | "else"
    let grammar = GrammarBuilder::new()
        .rule(
            "Keyword",
            PExpr::alt([PExpr::literal("if"), PExpr::literal("else")]),
        )
        .rule(
            "Ident",
            PExpr::seq([
                PExpr::not(PExpr::apply("Keyword")),
                PExpr::plus(PExpr::apply("letter")),
            ]),
        )
        .default_start_rule("Ident")
        .build()
        .expect("Failed to build grammar");
    let matcher = Matcher::new(&grammar);

    assert!(matcher.match_str("foo").unwrap().succeeded());

    let result = matcher.match_str("ifx").unwrap();
    assert!(!result.succeeded());
    assert_eq!(result.failure_pos(), Some(0));
    assert!(
        result
            .expected()
            .iter()
            .any(|e| matches!(e, Expected::Negation(p) if p == "Keyword")),
        "the negation itself is the expected entry: {:?}",
        result.expected()
    );
}

#[test]
fn test_failures_inside_negation_are_swallowed() {
    // ~~"a" succeeds only where "a" matches, but never reports "a".
    let grammar = GrammarBuilder::new()
        .rule(
            "start",
            PExpr::seq([
                PExpr::not(PExpr::not(PExpr::literal("a"))),
                PExpr::Anything,
            ]),
        )
        .default_start_rule("start")
        .build()
        .unwrap();
    let matcher = Matcher::new(&grammar);

    assert!(matcher.match_str("a").unwrap().succeeded());

    let result = matcher.match_str("b").unwrap();
    assert!(!result.succeeded());
    assert!(
        !result
            .expected()
            .iter()
            .any(|e| matches!(e, Expected::Literal(s) if s == "a")),
        "\"a\" must not surface through a double negation: {:?}",
        result.expected()
    );
}

#[test]
fn test_rightmost_failure_wins() {
    // start = "a" "b" "c" | "a" "x"
    let grammar = GrammarBuilder::new()
        .rule(
            "start",
            PExpr::alt([
                PExpr::Seq(vec![
                    PExpr::literal("a"),
                    PExpr::literal("b"),
                    PExpr::literal("c"),
                ]),
                PExpr::Seq(vec![PExpr::literal("a"), PExpr::literal("x"), PExpr::literal("!")]),
            ]),
        )
        .default_start_rule("start")
        .build()
        .unwrap();

    let result = Matcher::new(&grammar).match_str("abd").unwrap();
    assert!(!result.succeeded());
    assert_eq!(result.failure_pos(), Some(2));
    assert_eq!(result.expected(), &[Expected::Literal("c".into())]);
}

#[test]
fn test_all_alternatives_at_one_position_are_reported() {
    let grammar = GrammarBuilder::new()
        .rule(
            "start",
            PExpr::alt([PExpr::literal("a"), PExpr::literal("b")]),
        )
        .default_start_rule("start")
        .build()
        .unwrap();

    let result = Matcher::new(&grammar).match_str("c").unwrap();
    assert_eq!(result.failure_pos(), Some(0));
    assert_eq!(
        result.expected(),
        &[
            Expected::Literal("a".into()),
            Expected::Literal("b".into()),
        ]
    );
}

#[test]
fn test_described_rule_reports_as_a_unit() {
    // number matches digits but reports itself as "a number".
    let grammar = GrammarBuilder::new()
        .rule_with_description("number", "a number", PExpr::plus(PExpr::apply("digit")))
        .rule(
            "start",
            PExpr::seq([PExpr::literal("="), PExpr::apply("number")]),
        )
        .default_start_rule("start")
        .build()
        .unwrap();

    let result = Matcher::new(&grammar).match_str("=x").unwrap();
    assert!(!result.succeeded());
    assert_eq!(result.failure_pos(), Some(1));
    assert_eq!(
        result.expected(),
        &[Expected::Rule {
            name: "number".into(),
            description: Some("a number".into()),
        }]
    );
    assert_eq!(result.expected()[0].to_string(), "a number");
}

#[test]
fn test_whitespace_failures_do_not_pollute_expected_set() {
    // Start = "x" -- syntactic, so spaces are skipped before "x".
    let grammar = GrammarBuilder::new()
        .rule("Start", PExpr::literal("x"))
        .default_start_rule("Start")
        .build()
        .unwrap();

    let result = Matcher::new(&grammar).match_str("  y").unwrap();
    assert!(!result.succeeded());
    // Failure is reported after the skipped whitespace, and the space
    // rule itself never shows up as expected.
    assert_eq!(result.failure_pos(), Some(2));
    assert_eq!(result.expected(), &[Expected::Literal("x".into())]);
}

#[test]
fn test_end_of_input_expected_on_trailing_garbage() {
    let grammar = GrammarBuilder::new()
        .rule("start", PExpr::literal("done"))
        .default_start_rule("start")
        .build()
        .unwrap();

    let result = Matcher::new(&grammar).match_str("done?").unwrap();
    assert_eq!(result.failure_pos(), Some(4));
    assert_eq!(result.expected(), &[Expected::EndOfInput]);
}

#[test]
fn test_failure_message_formatting() {
    let grammar = GrammarBuilder::new()
        .rule(
            "start",
            PExpr::alt([PExpr::literal("a"), PExpr::literal("b")]),
        )
        .default_start_rule("start")
        .build()
        .unwrap();

    let result = Matcher::new(&grammar).match_str("z").unwrap();
    assert_eq!(
        result.failure_message().unwrap(),
        "at position 0: expected \"a\", \"b\""
    );

    let matched = Matcher::new(&grammar).match_str("a").unwrap();
    assert!(matched.failure_message().is_none());
}

#[test]
fn test_lookahead_failures_are_recorded() {
    // start = &"ab" any+ -- the lookahead's inner failure is reported.
    let grammar = GrammarBuilder::new()
        .rule(
            "start",
            PExpr::seq([
                PExpr::lookahead(PExpr::literal("ab")),
                PExpr::plus(PExpr::Anything),
            ]),
        )
        .default_start_rule("start")
        .build()
        .unwrap();

    let result = Matcher::new(&grammar).match_str("ax").unwrap();
    assert!(!result.succeeded());
    assert_eq!(result.failure_pos(), Some(0));
    assert_eq!(result.expected(), &[Expected::Literal("ab".into())]);
}

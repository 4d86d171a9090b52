use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use seedling::{Grammar, GrammarBuilder, Matcher, PExpr};

/// Left-recursive arithmetic with two precedence levels.
fn arithmetic_grammar() -> Grammar {
    GrammarBuilder::new()
        .rule("num", PExpr::plus(PExpr::apply("digit")))
        .rule(
            "AddRec",
            PExpr::seq([
                PExpr::apply("Add"),
                PExpr::literal("+"),
                PExpr::apply("Mul"),
            ]),
        )
        .rule(
            "Add",
            PExpr::alt([PExpr::apply("AddRec"), PExpr::apply("Mul")]),
        )
        .rule(
            "MulRec",
            PExpr::seq([
                PExpr::apply("Mul"),
                PExpr::literal("*"),
                PExpr::apply("num"),
            ]),
        )
        .rule(
            "Mul",
            PExpr::alt([PExpr::apply("MulRec"), PExpr::apply("num")]),
        )
        .default_start_rule("Add")
        .build()
        .expect("Failed to build grammar")
}

/// Lexical identifier list, iteration heavy.
fn ident_list_grammar() -> Grammar {
    GrammarBuilder::new()
        .rule(
            "ident",
            PExpr::seq([
                PExpr::apply("letter"),
                PExpr::star(PExpr::apply("alnum")),
            ]),
        )
        .rule(
            "rest",
            PExpr::star(PExpr::Seq(vec![
                PExpr::literal(","),
                PExpr::apply("ident"),
            ])),
        )
        .rule(
            "list",
            PExpr::seq([PExpr::apply("ident"), PExpr::apply("rest")]),
        )
        .default_start_rule("list")
        .build()
        .expect("Failed to build grammar")
}

fn bench_left_recursive_arithmetic(c: &mut Criterion) {
    let grammar = arithmetic_grammar();
    let matcher = Matcher::new(&grammar);

    let mut group = c.benchmark_group("left_recursive_arithmetic");
    for terms in [8usize, 64, 256] {
        let input = (0..terms)
            .map(|i| format!("{}*{}", i % 10, (i + 3) % 10))
            .collect::<Vec<_>>()
            .join("+");
        group.bench_function(format!("{terms}_terms"), |b| {
            b.iter(|| {
                let result = matcher.match_str(black_box(&input)).unwrap();
                assert!(result.succeeded());
                black_box(result)
            });
        });
    }
    group.finish();
}

fn bench_iteration_heavy_lexing(c: &mut Criterion) {
    let grammar = ident_list_grammar();
    let matcher = Matcher::new(&grammar);

    let mut group = c.benchmark_group("ident_list");
    for idents in [16usize, 128, 512] {
        let input = (0..idents)
            .map(|i| format!("ident{i}"))
            .collect::<Vec<_>>()
            .join(",");
        group.bench_function(format!("{idents}_idents"), |b| {
            b.iter(|| {
                let result = matcher.match_str(black_box(&input)).unwrap();
                assert!(result.succeeded());
                black_box(result)
            });
        });
    }
    group.finish();
}

fn bench_packrat_backtracking(c: &mut Criterion) {
    // Two long alternatives sharing a prefix: without memoization the
    // shared tail would be parsed twice per position.
    let grammar = GrammarBuilder::new()
        .rule("tail", PExpr::star(PExpr::literal("a")))
        .rule(
            "start",
            PExpr::alt([
                PExpr::Seq(vec![PExpr::apply("tail"), PExpr::literal("!")]),
                PExpr::Seq(vec![PExpr::apply("tail"), PExpr::literal("?")]),
            ]),
        )
        .default_start_rule("start")
        .build()
        .expect("Failed to build grammar");
    let matcher = Matcher::new(&grammar);

    let input = format!("{}?", "a".repeat(512));
    c.bench_function("packrat_backtracking_512", |b| {
        b.iter(|| {
            let result = matcher.match_str(black_box(&input)).unwrap();
            assert!(result.succeeded());
            black_box(result)
        });
    });
}

criterion_group!(
    benches,
    bench_left_recursive_arithmetic,
    bench_iteration_heavy_lexing,
    bench_packrat_backtracking
);
criterion_main!(benches);

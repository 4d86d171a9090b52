//! # Seedling
//!
//! A PEG (Parsing Expression Grammar) interpreter with packrat
//! memoization and seed-growing support for direct and indirect left
//! recursion, over both strings and structured values.
//!
//! ## Overview
//!
//! A grammar is a dictionary of named rules whose bodies are
//! [`PExpr`] trees (ordered choice, sequence, repetition, lookahead,
//! lexical scopes, structural patterns, parameterized rule application).
//! The evaluator interprets those trees directly:
//!
//! - **Packrat memoization**: rule applications are memoized per input
//!   position, keyed by the rule name plus its fully-substituted
//!   arguments, giving linear-time behavior for typical grammars.
//! - **Left recursion**: a left-recursive application is detected at its
//!   position, seeded with a failure, and grown by reparsing until the
//!   match stops getting longer -- so `Expr = Expr "-" Num | Num` parses
//!   left-associatively out of the box.
//! - **Structured inputs**: grammars can match over arbitrary
//!   [`Value`] trees (lists, maps, primitives), not just text.
//! - **Implicit whitespace**: rules with uppercase names skip whitespace
//!   between sub-matches, using the grammar's `spaces` rule; `#(...)`
//!   scopes opt out.
//!
//! ## Quick start
//!
//! ```rust
//! use seedling::{GrammarBuilder, Matcher, PExpr};
//!
//! // addend = digit+ ; sum = addend ("+" addend)*
//! let grammar = GrammarBuilder::new()
//!     .rule("addend", PExpr::plus(PExpr::apply("digit")))
//!     .rule(
//!         "sum",
//!         PExpr::seq([
//!             PExpr::apply("addend"),
//!             PExpr::star(PExpr::Seq(vec![
//!                 PExpr::literal("+"),
//!                 PExpr::apply("addend"),
//!             ])),
//!         ]),
//!     )
//!     .default_start_rule("sum")
//!     .build()
//!     .expect("grammar is well-formed");
//!
//! let matcher = Matcher::new(&grammar);
//! let result = matcher.match_str("12+34").expect("no grammar errors");
//! assert!(result.succeeded());
//!
//! let failure = matcher.match_str("12+").expect("no grammar errors");
//! assert_eq!(failure.failure_pos(), Some(3));
//! ```
//!
//! Alternatives of an ordered choice must share an arity, so a
//! left-recursive alternative with extra factors lives in its own rule:
//!
//! ```rust
//! use seedling::{GrammarBuilder, Matcher, PExpr};
//!
//! let grammar = GrammarBuilder::new()
//!     .rule("num", PExpr::plus(PExpr::apply("digit")))
//!     .rule(
//!         "diff",
//!         PExpr::seq([
//!             PExpr::apply("expr"),
//!             PExpr::literal("-"),
//!             PExpr::apply("num"),
//!         ]),
//!     )
//!     .rule(
//!         "expr",
//!         PExpr::alt([PExpr::apply("diff"), PExpr::apply("num")]),
//!     )
//!     .default_start_rule("expr")
//!     .build()
//!     .unwrap();
//!
//! // Left-associative: ((1-2)-3)
//! let result = Matcher::new(&grammar).match_str("1-2-3").unwrap();
//! assert!(result.succeeded());
//! ```
//!
//! ## Modules
//!
//! - [`grammar`] - grammar definition, expressions, validation
//! - [`eval`] - the matcher, results, failures and traces
//! - [`input`] - input streams and intervals
//! - [`tree`] - parse-tree nodes
//! - [`value`] - structured input values

pub mod eval;
pub mod grammar;
pub mod input;
pub mod tree;
pub mod value;

pub use eval::{Expected, MatchError, MatchResult, Matcher, MatcherConfig, TraceEntry};
pub use grammar::{CharPattern, Grammar, GrammarBuilder, GrammarError, PExpr, PropPattern, Rule, RuleApplication};
pub use input::{Interval, InputStream};
pub use tree::{ParseNode, SharedNode};
pub use value::{Value, ValueMap};

//! The evaluation core: matching inputs against a grammar.
//!
//! A [`Matcher`] drives one or more parses of a [`Grammar`]. Each parse
//! gets a fresh [`EvalState`](state::EvalState); the result is a
//! [`MatchResult`] -- either the root parse-tree node, or the rightmost
//! failure position with the set of expected expressions. Parse failure
//! is the expected negative outcome and is never an error; only
//! grammar-level programmer mistakes (unknown rules, argument mismatches)
//! and the recursion-depth guard surface as [`MatchError`].
//!
//! # Example
//!
//! ```rust
//! use seedling::{GrammarBuilder, Matcher, PExpr};
//!
//! let grammar = GrammarBuilder::new()
//!     .rule(
//!         "greeting",
//!         PExpr::seq([PExpr::literal("hi"), PExpr::plus(PExpr::literal("!"))]),
//!     )
//!     .default_start_rule("greeting")
//!     .build()
//!     .unwrap();
//!
//! let matcher = Matcher::new(&grammar);
//! assert!(matcher.match_str("hi!!").unwrap().succeeded());
//! assert!(!matcher.match_str("hi?").unwrap().succeeded());
//! ```

mod apply;
mod expr;
pub(crate) mod failure;
mod state;
pub(crate) mod trace;

pub use failure::Expected;
pub use trace::TraceEntry;

use compact_str::CompactString;

use crate::grammar::{Grammar, PExpr, RuleApplication};
use crate::input::InputStream;
use crate::tree::SharedNode;
use crate::value::Value;

use state::EvalState;

/// A fatal, grammar-level error. Distinct from a parse failure.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(feature = "diagnostics", derive(miette::Diagnostic))]
pub enum MatchError {
    #[error("Unknown rule: {0}")]
    UnknownRule(CompactString),

    #[error("Wrong number of arguments for rule {rule}: expected {expected}, found {found}")]
    WrongNumberOfArguments {
        rule: CompactString,
        expected: usize,
        found: usize,
    },

    #[error("Parameter index {0} out of range")]
    ParamIndexOutOfRange(usize),

    #[error("Start-rule argument {0} must have arity 1")]
    StartArgumentArity(usize),

    #[error("The grammar has no default start rule")]
    NoStartRule,

    #[error("Maximum application depth ({0}) exceeded")]
    DepthLimit(usize),
}

/// Configuration for a [`Matcher`].
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Maximum rule-application nesting. Exceeding it aborts the parse
    /// with [`MatchError::DepthLimit`] instead of overflowing the stack
    /// on runaway recursion.
    pub max_depth: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { max_depth: 10_000 }
    }
}

/// The outcome of a parse.
#[derive(Debug)]
pub enum MatchResult {
    /// The start rule matched the whole input.
    Match { root: SharedNode },
    /// The input did not match: the rightmost failure position and the
    /// expressions expected there.
    NoMatch {
        failure_pos: usize,
        expected: Vec<Expected>,
    },
}

impl MatchResult {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    #[must_use]
    pub const fn root(&self) -> Option<&SharedNode> {
        match self {
            Self::Match { root } => Some(root),
            Self::NoMatch { .. } => None,
        }
    }

    #[must_use]
    pub const fn failure_pos(&self) -> Option<usize> {
        match self {
            Self::Match { .. } => None,
            Self::NoMatch { failure_pos, .. } => Some(*failure_pos),
        }
    }

    #[must_use]
    pub fn expected(&self) -> &[Expected] {
        match self {
            Self::Match { .. } => &[],
            Self::NoMatch { expected, .. } => expected,
        }
    }

    /// A human-readable failure message, or `None` for a match.
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        match self {
            Self::Match { .. } => None,
            Self::NoMatch {
                failure_pos,
                expected,
            } => {
                let expected = expected
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("at position {failure_pos}: expected {expected}"))
            }
        }
    }
}

/// Matches inputs against a grammar.
///
/// The matcher borrows the grammar; every call runs an independent parse
/// with its own state, memo tables and failure tracking.
pub struct Matcher<'g> {
    grammar: &'g Grammar,
    config: MatcherConfig,
}

impl<'g> Matcher<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_config(grammar, MatcherConfig::default())
    }

    #[must_use]
    pub const fn with_config(grammar: &'g Grammar, config: MatcherConfig) -> Self {
        Self { grammar, config }
    }

    /// Match a string against the grammar's default start rule.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::NoStartRule`] when the grammar has no
    /// default start rule, or any grammar-level error hit during the
    /// parse.
    pub fn match_str(&self, input: &str) -> Result<MatchResult, MatchError> {
        self.match_str_rule(input, self.start_rule()?)
    }

    /// Match a string against a specific start rule.
    pub fn match_str_rule(&self, input: &str, start: &str) -> Result<MatchResult, MatchError> {
        self.run(InputStream::from_str(input), start, Vec::new(), false)
            .map(|(result, _)| result)
    }

    /// Match a structured value against the default start rule.
    pub fn match_value(&self, value: &Value) -> Result<MatchResult, MatchError> {
        self.match_value_rule(value, self.start_rule()?)
    }

    /// Match a structured value against a specific start rule.
    pub fn match_value_rule(&self, value: &Value, start: &str) -> Result<MatchResult, MatchError> {
        self.run(InputStream::for_value(value), start, Vec::new(), false)
            .map(|(result, _)| result)
    }

    /// Match against a parameterized start rule with concrete argument
    /// expressions.
    pub fn match_rule_with_args(
        &self,
        value: &Value,
        start: &str,
        args: Vec<PExpr>,
    ) -> Result<MatchResult, MatchError> {
        self.run(InputStream::for_value(value), start, args, false)
            .map(|(result, _)| result)
    }

    /// Like [`match_str`](Self::match_str), also returning the trace tree.
    pub fn trace_str(&self, input: &str) -> Result<(MatchResult, TraceEntry), MatchError> {
        self.trace_str_rule(input, self.start_rule()?)
    }

    /// Like [`match_str_rule`](Self::match_str_rule), also returning the
    /// trace tree.
    pub fn trace_str_rule(
        &self,
        input: &str,
        start: &str,
    ) -> Result<(MatchResult, TraceEntry), MatchError> {
        let (result, trace) = self.run(InputStream::from_str(input), start, Vec::new(), true)?;
        Ok((result, trace.expect("tracing was enabled")))
    }

    /// Like [`match_value`](Self::match_value), also returning the trace
    /// tree.
    pub fn trace_value(&self, value: &Value) -> Result<(MatchResult, TraceEntry), MatchError> {
        self.trace_value_rule(value, self.start_rule()?)
    }

    /// Like [`match_value_rule`](Self::match_value_rule), also returning
    /// the trace tree.
    pub fn trace_value_rule(
        &self,
        value: &Value,
        start: &str,
    ) -> Result<(MatchResult, TraceEntry), MatchError> {
        let (result, trace) = self.run(InputStream::for_value(value), start, Vec::new(), true)?;
        Ok((result, trace.expect("tracing was enabled")))
    }

    fn start_rule(&self) -> Result<&'g str, MatchError> {
        self.grammar
            .default_start_rule()
            .ok_or(MatchError::NoStartRule)
    }

    fn run(
        &self,
        stream: InputStream,
        start: &str,
        args: Vec<PExpr>,
        tracing: bool,
    ) -> Result<(MatchResult, Option<TraceEntry>), MatchError> {
        let rule = self
            .grammar
            .rule(start)
            .ok_or_else(|| MatchError::UnknownRule(start.into()))?;
        if args.len() != rule.param_count() {
            return Err(MatchError::WrongNumberOfArguments {
                rule: start.into(),
                expected: rule.param_count(),
                found: args.len(),
            });
        }
        for (index, arg) in args.iter().enumerate() {
            if arg.arity() != 1 {
                return Err(MatchError::StartArgumentArity(index));
            }
        }

        let mut state = EvalState::new(self.grammar, stream, self.config.max_depth, tracing);
        let start_expr = PExpr::Apply(Box::new(RuleApplication::with_args(start, args)));
        let succeeded = start_expr.eval(&mut state)?;
        let trace = tracing.then(|| state.finish_trace()).flatten();

        if succeeded {
            let root = state.pop_binding();
            Ok((MatchResult::Match { root }, trace))
        } else {
            let tracker = std::mem::take(&mut state.failures);
            let (failure_pos, expected) = tracker.into_summary();
            Ok((
                MatchResult::NoMatch {
                    failure_pos,
                    expected,
                },
                trace,
            ))
        }
    }
}

use std::fmt;

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::value::Value;

/// A parsing expression.
///
/// The family is closed: evaluation is a single dispatch over these
/// variants. Every expression has a static [`arity`](Self::arity) -- the
/// number of parse-tree nodes it contributes to the enclosing rule when it
/// succeeds.
#[derive(Debug, Clone, PartialEq)]
pub enum PExpr {
    /// Consume any single atom.
    Anything,
    /// Succeed exactly at end of input, binding a synthetic leaf.
    End,
    /// Consume one atom equal to the given value.
    Prim(Value),
    /// Consume an exact run of code points (or one string atom).
    StringPrim(CompactString),
    /// Consume one atom `x` with `from <= x <= to`, same primitive kind.
    Range { from: Value, to: Value },
    /// Consume one code point satisfying a category predicate.
    UnicodeChar(CharPattern),
    /// Evaluate the i-th actual argument of the current application.
    Param(usize),
    /// Evaluate in lexical context (no implicit whitespace skipping).
    Lex(Box<PExpr>),
    /// Ordered choice: first succeeding alternative wins.
    Alt(Vec<PExpr>),
    /// Left-to-right sequence.
    Seq(Vec<PExpr>),
    /// Repetition with a minimum and optional maximum count.
    Iter {
        expr: Box<PExpr>,
        min: usize,
        max: Option<usize>,
    },
    /// Negative lookahead. Consumes nothing, binds nothing.
    Not(Box<PExpr>),
    /// Positive lookahead. Binds, but consumes nothing.
    Lookahead(Box<PExpr>),
    /// Consume one list atom and match its elements to exhaustion.
    Arr(Box<PExpr>),
    /// Consume one string atom and match its code points to exhaustion.
    Str(Box<PExpr>),
    /// Consume one map atom, matching each declared property's value.
    Obj {
        properties: Vec<PropPattern>,
        lenient: bool,
    },
    /// Apply a rule, with fully-substituted argument expressions.
    Apply(Box<RuleApplication>),
}

/// One declared property of an [`PExpr::Obj`] pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PropPattern {
    pub name: CompactString,
    pub pattern: PExpr,
}

/// A rule application: rule name plus argument expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleApplication {
    pub rule: CompactString,
    pub args: SmallVec<[PExpr; 2]>,
}

impl RuleApplication {
    #[must_use]
    pub fn new(rule: impl Into<CompactString>) -> Self {
        Self {
            rule: rule.into(),
            args: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_args(rule: impl Into<CompactString>, args: impl IntoIterator<Item = PExpr>) -> Self {
        Self {
            rule: rule.into(),
            args: args.into_iter().collect(),
        }
    }

    /// A rule is syntactic iff its name starts with an uppercase letter.
    /// Syntactic applications implicitly skip whitespace.
    #[must_use]
    pub fn is_syntactic(&self) -> bool {
        self.rule.chars().next().is_some_and(char::is_uppercase)
    }

    /// Canonical memo-key text: `rule` or `rule<arg1,arg2>`.
    #[must_use]
    pub fn memo_key_text(&self) -> CompactString {
        if self.args.is_empty() {
            return self.rule.clone();
        }
        let mut out = String::from(self.rule.as_str());
        out.push('<');
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&arg.to_string());
        }
        out.push('>');
        out.into()
    }
}

/// Code-point category predicates for [`PExpr::UnicodeChar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharPattern {
    Letter,
    Digit,
    Alnum,
    Lower,
    Upper,
    Space,
}

impl CharPattern {
    #[must_use]
    pub fn matches(self, c: char) -> bool {
        match self {
            Self::Letter => c.is_alphabetic(),
            Self::Digit => c.is_numeric(),
            Self::Alnum => c.is_alphanumeric(),
            Self::Lower => c.is_lowercase(),
            Self::Upper => c.is_uppercase(),
            Self::Space => c.is_whitespace(),
        }
    }

    #[must_use]
    pub const fn category_name(self) -> &'static str {
        match self {
            Self::Letter => "Letter",
            Self::Digit => "Digit",
            Self::Alnum => "Alnum",
            Self::Lower => "Lower",
            Self::Upper => "Upper",
            Self::Space => "Space",
        }
    }
}

// Builder methods
impl PExpr {
    #[must_use]
    pub const fn anything() -> Self {
        Self::Anything
    }

    #[must_use]
    pub const fn end() -> Self {
        Self::End
    }

    /// Match a literal run of code points.
    #[must_use]
    pub fn literal(s: impl Into<CompactString>) -> Self {
        Self::StringPrim(s.into())
    }

    /// Match one atom equal to `value`.
    #[must_use]
    pub fn terminal(value: impl Into<Value>) -> Self {
        Self::Prim(value.into())
    }

    #[must_use]
    pub fn range(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self::Range {
            from: from.into(),
            to: to.into(),
        }
    }

    #[must_use]
    pub const fn param(index: usize) -> Self {
        Self::Param(index)
    }

    #[must_use]
    pub fn apply(rule: impl Into<CompactString>) -> Self {
        Self::Apply(Box::new(RuleApplication::new(rule)))
    }

    #[must_use]
    pub fn apply_with_args(
        rule: impl Into<CompactString>,
        args: impl IntoIterator<Item = Self>,
    ) -> Self {
        Self::Apply(Box::new(RuleApplication::with_args(rule, args)))
    }

    /// Create a sequence, collapsing a singleton to its only element.
    #[must_use]
    pub fn seq<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut vec: Vec<_> = exprs.into_iter().collect();
        if vec.len() == 1 {
            vec.pop().unwrap()
        } else {
            Self::Seq(vec)
        }
    }

    /// Create an ordered choice, collapsing a singleton to its only element.
    #[must_use]
    pub fn alt<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut vec: Vec<_> = exprs.into_iter().collect();
        if vec.len() == 1 {
            vec.pop().unwrap()
        } else {
            Self::Alt(vec)
        }
    }

    #[must_use]
    pub fn star(expr: Self) -> Self {
        Self::Iter {
            expr: Box::new(expr),
            min: 0,
            max: None,
        }
    }

    #[must_use]
    pub fn plus(expr: Self) -> Self {
        Self::Iter {
            expr: Box::new(expr),
            min: 1,
            max: None,
        }
    }

    #[must_use]
    pub fn opt(expr: Self) -> Self {
        Self::Iter {
            expr: Box::new(expr),
            min: 0,
            max: Some(1),
        }
    }

    #[must_use]
    pub fn not(expr: Self) -> Self {
        Self::Not(Box::new(expr))
    }

    #[must_use]
    pub fn lookahead(expr: Self) -> Self {
        Self::Lookahead(Box::new(expr))
    }

    #[must_use]
    pub fn lex(expr: Self) -> Self {
        Self::Lex(Box::new(expr))
    }

    #[must_use]
    pub fn arr(expr: Self) -> Self {
        Self::Arr(Box::new(expr))
    }

    #[must_use]
    pub fn str_pattern(expr: Self) -> Self {
        Self::Str(Box::new(expr))
    }

    #[must_use]
    pub fn obj<K, I>(properties: I, lenient: bool) -> Self
    where
        K: Into<CompactString>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Obj {
            properties: properties
                .into_iter()
                .map(|(name, pattern)| PropPattern {
                    name: name.into(),
                    pattern,
                })
                .collect(),
            lenient,
        }
    }
}

impl PExpr {
    /// The number of bindings this expression contributes on success.
    ///
    /// Pure and static: alternation arity is the arity shared by all
    /// alternatives (enforced at grammar build time), `Param` arity is 1
    /// (rule arguments are required to have arity 1).
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Anything
            | Self::End
            | Self::Prim(_)
            | Self::StringPrim(_)
            | Self::Range { .. }
            | Self::UnicodeChar(_)
            | Self::Param(_)
            | Self::Apply(_) => 1,
            Self::Lex(expr) | Self::Iter { expr, .. } | Self::Lookahead(expr) => expr.arity(),
            Self::Alt(alternatives) => alternatives.first().map_or(0, Self::arity),
            Self::Seq(factors) => factors.iter().map(Self::arity).sum(),
            Self::Not(_) | Self::Arr(_) | Self::Str(_) => 0,
            Self::Obj { lenient, .. } => usize::from(*lenient),
        }
    }

    /// Replace every `Param(i)` with the caller's i-th actual argument.
    /// Fails with the offending index when one is out of range.
    pub(crate) fn substitute_params(&self, actuals: &[Self]) -> Result<Self, usize> {
        let subst_all = |exprs: &[Self]| -> Result<Vec<Self>, usize> {
            exprs.iter().map(|e| e.substitute_params(actuals)).collect()
        };
        Ok(match self {
            Self::Param(index) => actuals.get(*index).ok_or(*index)?.clone(),
            Self::Lex(expr) => Self::Lex(Box::new(expr.substitute_params(actuals)?)),
            Self::Alt(alternatives) => Self::Alt(subst_all(alternatives)?),
            Self::Seq(factors) => Self::Seq(subst_all(factors)?),
            Self::Iter { expr, min, max } => Self::Iter {
                expr: Box::new(expr.substitute_params(actuals)?),
                min: *min,
                max: *max,
            },
            Self::Not(expr) => Self::Not(Box::new(expr.substitute_params(actuals)?)),
            Self::Lookahead(expr) => Self::Lookahead(Box::new(expr.substitute_params(actuals)?)),
            Self::Arr(expr) => Self::Arr(Box::new(expr.substitute_params(actuals)?)),
            Self::Str(expr) => Self::Str(Box::new(expr.substitute_params(actuals)?)),
            Self::Obj {
                properties,
                lenient,
            } => Self::Obj {
                properties: properties
                    .iter()
                    .map(|p| {
                        Ok(PropPattern {
                            name: p.name.clone(),
                            pattern: p.pattern.substitute_params(actuals)?,
                        })
                    })
                    .collect::<Result<_, usize>>()?,
                lenient: *lenient,
            },
            Self::Apply(app) => Self::Apply(Box::new(RuleApplication {
                rule: app.rule.clone(),
                args: app
                    .args
                    .iter()
                    .map(|a| a.substitute_params(actuals))
                    .collect::<Result<_, usize>>()?,
            })),
            other => other.clone(),
        })
    }

    /// True if any `Param` occurs anywhere in this expression.
    #[must_use]
    pub(crate) fn references_params(&self) -> bool {
        match self {
            Self::Param(_) => true,
            Self::Lex(expr)
            | Self::Iter { expr, .. }
            | Self::Not(expr)
            | Self::Lookahead(expr)
            | Self::Arr(expr)
            | Self::Str(expr) => expr.references_params(),
            Self::Alt(exprs) | Self::Seq(exprs) => exprs.iter().any(Self::references_params),
            Self::Obj { properties, .. } => {
                properties.iter().any(|p| p.pattern.references_params())
            }
            Self::Apply(app) => app.args.iter().any(Self::references_params),
            _ => false,
        }
    }
}

/// The canonical descriptor: used for memo keys, expected-set diagnostics
/// and trace labels. Must be a total function of the expression.
impl fmt::Display for PExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anything => write!(f, "any"),
            Self::End => write!(f, "end"),
            Self::Prim(value) => write!(f, "{value}"),
            Self::StringPrim(s) => write!(f, "{s:?}"),
            Self::Range { from, to } => write!(f, "{from}..{to}"),
            Self::UnicodeChar(pattern) => write!(f, "\\p{{{}}}", pattern.category_name()),
            Self::Param(index) => write!(f, "${index}"),
            Self::Lex(expr) => write!(f, "#({expr})"),
            Self::Alt(alternatives) => {
                write!(f, "(")?;
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                write!(f, ")")
            }
            Self::Seq(factors) => {
                write!(f, "(")?;
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{factor}")?;
                }
                write!(f, ")")
            }
            Self::Iter { expr, min, max } => match (min, max) {
                (0, None) => write!(f, "{expr}*"),
                (1, None) => write!(f, "{expr}+"),
                (0, Some(1)) => write!(f, "{expr}?"),
                (min, None) => write!(f, "{expr}{{{min},}}"),
                (min, Some(max)) => write!(f, "{expr}{{{min},{max}}}"),
            },
            Self::Not(expr) => write!(f, "~{expr}"),
            Self::Lookahead(expr) => write!(f, "&{expr}"),
            Self::Arr(expr) => write!(f, "[{expr}]"),
            Self::Str(expr) => write!(f, "str({expr})"),
            Self::Obj {
                properties,
                lenient,
            } => {
                write!(f, "{{")?;
                for (i, prop) in properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", prop.name, prop.pattern)?;
                }
                if *lenient {
                    if !properties.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, "}}")
            }
            Self::Apply(app) => write!(f, "{}", app.memo_key_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        assert_eq!(PExpr::Anything.arity(), 1);
        assert_eq!(PExpr::not(PExpr::Anything).arity(), 0);
        assert_eq!(PExpr::lookahead(PExpr::Anything).arity(), 1);
        assert_eq!(
            PExpr::Seq(vec![PExpr::Anything, PExpr::not(PExpr::End), PExpr::End]).arity(),
            2
        );
        assert_eq!(PExpr::star(PExpr::Anything).arity(), 1);
        assert_eq!(PExpr::arr(PExpr::Anything).arity(), 0);
        assert_eq!(PExpr::obj([("a", PExpr::Anything)], true).arity(), 1);
        assert_eq!(PExpr::obj([("a", PExpr::Anything)], false).arity(), 0);
    }

    #[test]
    fn test_singleton_collapse() {
        assert_eq!(PExpr::seq([PExpr::Anything]), PExpr::Anything);
        assert_eq!(PExpr::alt([PExpr::End]), PExpr::End);
        assert!(matches!(
            PExpr::seq([PExpr::Anything, PExpr::End]),
            PExpr::Seq(_)
        ));
    }

    #[test]
    fn test_memo_key_text() {
        let plain = RuleApplication::new("expr");
        assert_eq!(plain.memo_key_text(), "expr");

        let parameterized = RuleApplication::with_args(
            "listOf",
            [PExpr::apply("digit"), PExpr::literal(",")],
        );
        assert_eq!(parameterized.memo_key_text(), "listOf<digit,\",\">");
    }

    #[test]
    fn test_substitute_params() {
        let body = PExpr::seq([PExpr::Param(0), PExpr::apply_with_args("wrap", [PExpr::Param(1)])]);
        let actuals = [PExpr::literal("a"), PExpr::apply("digit")];
        let substituted = body.substitute_params(&actuals).unwrap();
        assert_eq!(
            substituted,
            PExpr::seq([
                PExpr::literal("a"),
                PExpr::apply_with_args("wrap", [PExpr::apply("digit")]),
            ])
        );

        assert_eq!(PExpr::Param(2).substitute_params(&actuals), Err(2));
    }

    #[test]
    fn test_display_descriptors() {
        assert_eq!(PExpr::literal("ab").to_string(), "\"ab\"");
        assert_eq!(PExpr::range("0", "9").to_string(), "\"0\"..\"9\"");
        assert_eq!(
            PExpr::alt([PExpr::literal("a"), PExpr::literal("b")]).to_string(),
            "(\"a\" | \"b\")"
        );
        assert_eq!(PExpr::star(PExpr::apply("digit")).to_string(), "digit*");
        assert_eq!(
            PExpr::UnicodeChar(CharPattern::Letter).to_string(),
            "\\p{Letter}"
        );
        assert_eq!(
            PExpr::obj([("name", PExpr::apply("string"))], true).to_string(),
            "{name: string, ...}"
        );
    }

    #[test]
    fn test_is_syntactic() {
        assert!(RuleApplication::new("Expr").is_syntactic());
        assert!(!RuleApplication::new("expr").is_syntactic());
        assert!(!RuleApplication::new("_iter").is_syntactic());
    }
}

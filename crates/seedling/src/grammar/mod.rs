//! Grammar definition and validation.
//!
//! A [`Grammar`] is a dictionary of named, optionally parameterized rules
//! whose bodies are [`PExpr`] trees, plus a default start rule and the
//! implicit whitespace rule. Grammars are built with [`GrammarBuilder`],
//! which validates rule references, parameter indices and arities up
//! front so the evaluator can treat the grammar as well-formed.
//!
//! Rules whose names begin with an uppercase letter are *syntactic*:
//! applying one implicitly skips whitespace (via the `spaces` rule)
//! before each sub-application, except inside a lexical (`#(...)`)
//! context.

pub mod expr;

pub use expr::{CharPattern, PExpr, PropPattern, RuleApplication};

use compact_str::CompactString;
use hashbrown::HashMap;

/// A named production rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) name: CompactString,
    pub(crate) param_count: usize,
    pub(crate) body: PExpr,
    /// User-visible description. When present, failures inside the body
    /// are collapsed into a single failure labeled by this rule.
    pub(crate) description: Option<CompactString>,
}

impl Rule {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn body(&self) -> &PExpr {
        &self.body
    }

    #[must_use]
    pub const fn param_count(&self) -> usize {
        self.param_count
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A compiled grammar: rule dictionary, default start rule, whitespace
/// rule handle.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: HashMap<CompactString, Rule, ahash::RandomState>,
    default_start_rule: Option<CompactString>,
    spaces_application: RuleApplication,
}

impl Grammar {
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    #[must_use]
    pub fn default_start_rule(&self) -> Option<&str> {
        self.default_start_rule.as_deref()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// The application evaluated for implicit whitespace skipping.
    #[must_use]
    pub(crate) const fn spaces_application(&self) -> &RuleApplication {
        &self.spaces_application
    }
}

/// Errors detected while building a grammar.
///
/// These are programmer errors in the grammar itself, not parse failures.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(feature = "diagnostics", derive(miette::Diagnostic))]
pub enum GrammarError {
    #[error("Duplicate rule definition: {0}")]
    DuplicateRule(CompactString),

    #[error("Unknown rule {rule} referenced in {referenced_in}")]
    UnknownRule {
        rule: CompactString,
        referenced_in: CompactString,
    },

    #[error(
        "Wrong number of arguments for {rule} in {referenced_in}: expected {expected}, found {found}"
    )]
    WrongNumberOfArguments {
        rule: CompactString,
        expected: usize,
        found: usize,
        referenced_in: CompactString,
    },

    #[error("Parameter index {index} out of range in rule {rule} (which takes {param_count})")]
    ParamIndexOutOfRange {
        index: usize,
        rule: CompactString,
        param_count: usize,
    },

    #[error("Alternatives of an ordered choice in {rule} have inconsistent arities")]
    InconsistentArity { rule: CompactString },

    #[error("Argument {index} of {rule} application in {referenced_in} must have arity 1")]
    RuleArgumentArity {
        rule: CompactString,
        index: usize,
        referenced_in: CompactString,
    },

    #[error("Default start rule {0} is not defined")]
    UnknownStartRule(CompactString),
}

/// Builder for [`Grammar`].
///
/// Standard rules (`any`, `end`, `letter`, `digit`, `alnum`, `lower`,
/// `upper`, `space`, `spaces`) are injected at build time unless the
/// grammar defines its own.
pub struct GrammarBuilder {
    rules: Vec<Rule>,
    default_start_rule: Option<CompactString>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_start_rule: None,
        }
    }

    #[must_use]
    pub fn default_start_rule(mut self, name: impl Into<CompactString>) -> Self {
        self.default_start_rule = Some(name.into());
        self
    }

    #[must_use]
    pub fn rule(self, name: impl Into<CompactString>, body: PExpr) -> Self {
        self.push(name.into(), 0, body, None)
    }

    #[must_use]
    pub fn rule_with_description(
        self,
        name: impl Into<CompactString>,
        description: impl Into<CompactString>,
        body: PExpr,
    ) -> Self {
        self.push(name.into(), 0, body, Some(description.into()))
    }

    /// A rule taking `param_count` arguments, referenced in the body as
    /// `PExpr::Param(0..param_count)`.
    #[must_use]
    pub fn parameterized_rule(
        self,
        name: impl Into<CompactString>,
        param_count: usize,
        body: PExpr,
    ) -> Self {
        self.push(name.into(), param_count, body, None)
    }

    fn push(
        mut self,
        name: CompactString,
        param_count: usize,
        body: PExpr,
        description: Option<CompactString>,
    ) -> Self {
        self.rules.push(Rule {
            name,
            param_count,
            body,
            description,
        });
        self
    }

    /// Validate and build the grammar.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for duplicate rules, references to
    /// unknown rules, argument-count mismatches, out-of-range parameter
    /// indices, inconsistent alternation arities, or rule arguments whose
    /// arity is not 1.
    pub fn build(mut self) -> Result<Grammar, GrammarError> {
        for builtin in standard_rules() {
            if !self.rules.iter().any(|r| r.name == builtin.name) {
                self.rules.push(builtin);
            }
        }

        let mut rules: HashMap<CompactString, Rule, ahash::RandomState> =
            HashMap::with_hasher(ahash::RandomState::new());
        for rule in self.rules {
            if rules.contains_key(&rule.name) {
                return Err(GrammarError::DuplicateRule(rule.name));
            }
            rules.insert(rule.name.clone(), rule);
        }

        for rule in rules.values() {
            check_expr(&rule.body, rule, &rules)?;
        }

        if let Some(start) = &self.default_start_rule {
            if !rules.contains_key(start) {
                return Err(GrammarError::UnknownStartRule(start.clone()));
            }
        }

        Ok(Grammar {
            rules,
            default_start_rule: self.default_start_rule,
            spaces_application: RuleApplication::new("spaces"),
        })
    }
}

/// The rules every grammar gets unless it overrides them.
fn standard_rules() -> Vec<Rule> {
    fn rule(name: &str, description: Option<&str>, body: PExpr) -> Rule {
        Rule {
            name: name.into(),
            param_count: 0,
            body,
            description: description.map(Into::into),
        }
    }

    vec![
        rule("any", Some("any object"), PExpr::Anything),
        rule("end", Some("end of input"), PExpr::End),
        rule(
            "letter",
            Some("a letter"),
            PExpr::UnicodeChar(CharPattern::Letter),
        ),
        rule("digit", Some("a digit"), PExpr::range("0", "9")),
        rule(
            "alnum",
            Some("an alphanumeric character"),
            PExpr::alt([PExpr::apply("letter"), PExpr::apply("digit")]),
        ),
        rule(
            "lower",
            Some("a lowercase letter"),
            PExpr::UnicodeChar(CharPattern::Lower),
        ),
        rule(
            "upper",
            Some("an uppercase letter"),
            PExpr::UnicodeChar(CharPattern::Upper),
        ),
        rule(
            "space",
            Some("a space"),
            PExpr::UnicodeChar(CharPattern::Space),
        ),
        rule("spaces", None, PExpr::star(PExpr::apply("space"))),
    ]
}

fn check_expr(
    expr: &PExpr,
    rule: &Rule,
    rules: &HashMap<CompactString, Rule, ahash::RandomState>,
) -> Result<(), GrammarError> {
    match expr {
        PExpr::Param(index) => {
            if *index >= rule.param_count {
                return Err(GrammarError::ParamIndexOutOfRange {
                    index: *index,
                    rule: rule.name.clone(),
                    param_count: rule.param_count,
                });
            }
        }
        PExpr::Apply(app) => {
            let Some(target) = rules.get(&app.rule) else {
                return Err(GrammarError::UnknownRule {
                    rule: app.rule.clone(),
                    referenced_in: rule.name.clone(),
                });
            };
            if app.args.len() != target.param_count {
                return Err(GrammarError::WrongNumberOfArguments {
                    rule: app.rule.clone(),
                    expected: target.param_count,
                    found: app.args.len(),
                    referenced_in: rule.name.clone(),
                });
            }
            for (index, arg) in app.args.iter().enumerate() {
                if arg.arity() != 1 {
                    return Err(GrammarError::RuleArgumentArity {
                        rule: app.rule.clone(),
                        index,
                        referenced_in: rule.name.clone(),
                    });
                }
                check_expr(arg, rule, rules)?;
            }
        }
        PExpr::Alt(alternatives) => {
            let arity = expr.arity();
            for alt in alternatives {
                if alt.arity() != arity {
                    return Err(GrammarError::InconsistentArity {
                        rule: rule.name.clone(),
                    });
                }
                check_expr(alt, rule, rules)?;
            }
        }
        PExpr::Seq(factors) => {
            for factor in factors {
                check_expr(factor, rule, rules)?;
            }
        }
        PExpr::Lex(inner)
        | PExpr::Iter { expr: inner, .. }
        | PExpr::Not(inner)
        | PExpr::Lookahead(inner)
        | PExpr::Arr(inner)
        | PExpr::Str(inner) => check_expr(inner, rule, rules)?,
        PExpr::Obj { properties, .. } => {
            for prop in properties {
                check_expr(&prop.pattern, rule, rules)?;
            }
        }
        PExpr::Anything
        | PExpr::End
        | PExpr::Prim(_)
        | PExpr::StringPrim(_)
        | PExpr::Range { .. }
        | PExpr::UnicodeChar(_) => {}
    }
    Ok(())
}

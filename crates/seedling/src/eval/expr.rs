//! The expression evaluator.
//!
//! [`PExpr::eval`] is the uniform entry point: on success the bindings
//! stack grows by exactly the expression's arity and the cursor may have
//! advanced; on failure both are restored to their pre-call values. The
//! save/restore logic lives here once; the per-variant code in
//! [`eval_inner`](PExpr::eval_inner) does not restore on failure.
//!
//! In syntactic context (current application is an uppercase-named rule,
//! no lexical scope active), the atom-consuming variants skip whitespace
//! before matching.

use compact_str::CompactString;

use crate::grammar::{PExpr, PropPattern};
use crate::input::{Atom, InputStream};
use crate::tree::ParseNode;
use crate::value::{Value, ValueMap};

use super::failure::Expected;
use super::state::EvalState;
use super::trace::TraceEntry;
use super::MatchError;

impl PExpr {
    /// Evaluate this expression against the current state.
    ///
    /// # Errors
    ///
    /// Fails only for grammar-level programmer errors (unknown rule,
    /// argument mismatch, depth limit); an unmatched input is `Ok(false)`.
    pub(crate) fn eval(&self, state: &mut EvalState<'_>) -> Result<bool, MatchError> {
        let orig_pos = state.pos();
        let orig_bindings = state.bindings_len();
        let tracing = state.tracing();
        if tracing {
            state.push_trace_collector();
        }

        let succeeded = self.eval_inner(state)?;
        if succeeded {
            debug_assert_eq!(
                state.bindings_len(),
                orig_bindings + self.arity(),
                "arity contract violated by {self}"
            );
        } else {
            state.set_pos(orig_pos);
            state.truncate_bindings(orig_bindings);
        }

        if tracing {
            let children = state.pop_trace_collector();
            let mut entry =
                TraceEntry::new(orig_pos, self.to_string().into(), succeeded, children);
            entry.replayed_from_memo = state.take_replay_mark();
            entry.left_recursive = state.take_lr_mark();
            if let Some((pos, key)) = state.take_memo_trace_target() {
                state.attach_memo_trace(pos, key, entry.clone());
            }
            state.append_trace(entry);
        }
        Ok(succeeded)
    }

    fn eval_inner(&self, state: &mut EvalState<'_>) -> Result<bool, MatchError> {
        match self {
            Self::Anything => {
                state.skip_spaces_if_in_syntactic_context()?;
                let orig_pos = state.pos();
                match take_atom(state) {
                    Some(value) => {
                        let interval = state.stream().interval(orig_pos);
                        state.push_binding(ParseNode::terminal(Some(value), interval));
                        Ok(true)
                    }
                    None => {
                        state.record_failure(orig_pos, expected_of(self));
                        Ok(false)
                    }
                }
            }

            Self::End => {
                state.skip_spaces_if_in_syntactic_context()?;
                let pos = state.pos();
                if state.stream().at_end() {
                    let interval = state.stream().interval_to(pos, pos);
                    state.push_binding(ParseNode::terminal(None, interval));
                    Ok(true)
                } else {
                    state.record_failure(pos, Expected::EndOfInput);
                    Ok(false)
                }
            }

            Self::Prim(value) => {
                state.skip_spaces_if_in_syntactic_context()?;
                let orig_pos = state.pos();
                if state.stream_mut().match_exactly(value) {
                    let interval = state.stream().interval(orig_pos);
                    state.push_binding(ParseNode::terminal(Some(value.clone()), interval));
                    Ok(true)
                } else {
                    state.record_failure(orig_pos, expected_of(self));
                    Ok(false)
                }
            }

            Self::StringPrim(text) => {
                state.skip_spaces_if_in_syntactic_context()?;
                let orig_pos = state.pos();
                if state.stream_mut().match_str(text) {
                    let interval = state.stream().interval(orig_pos);
                    state.push_binding(ParseNode::terminal(
                        Some(Value::Str(text.clone())),
                        interval,
                    ));
                    Ok(true)
                } else {
                    state.record_failure(orig_pos, expected_of(self));
                    Ok(false)
                }
            }

            Self::Range { from, to } => {
                state.skip_spaces_if_in_syntactic_context()?;
                let orig_pos = state.pos();
                let matched = match state.stream().peek() {
                    Some(Atom::Char(c)) => match (single_char(from), single_char(to)) {
                        (Some(lo), Some(hi)) if lo <= c && c <= hi => {
                            Some(Value::Str(char_text(c)))
                        }
                        _ => None,
                    },
                    Some(Atom::Value(v)) if from <= v && v <= to => Some(v.clone()),
                    _ => None,
                };
                match matched {
                    Some(value) => {
                        state.set_pos(orig_pos + 1);
                        let interval = state.stream().interval(orig_pos);
                        state.push_binding(ParseNode::terminal(Some(value), interval));
                        Ok(true)
                    }
                    None => {
                        state.record_failure(orig_pos, expected_of(self));
                        Ok(false)
                    }
                }
            }

            Self::UnicodeChar(pattern) => {
                state.skip_spaces_if_in_syntactic_context()?;
                let orig_pos = state.pos();
                match state.stream().peek() {
                    Some(Atom::Char(c)) if pattern.matches(c) => {
                        state.set_pos(orig_pos + 1);
                        let interval = state.stream().interval(orig_pos);
                        state.push_binding(ParseNode::terminal(
                            Some(Value::Str(char_text(c))),
                            interval,
                        ));
                        Ok(true)
                    }
                    _ => {
                        state.record_failure(orig_pos, expected_of(self));
                        Ok(false)
                    }
                }
            }

            Self::Param(index) => {
                let arg = state
                    .current_application()
                    .and_then(|applied| applied.app.args.get(*index))
                    .cloned()
                    .ok_or(MatchError::ParamIndexOutOfRange(*index))?;
                arg.eval(state)
            }

            Self::Lex(expr) => {
                let was_lexical = state.set_lexical_context(true);
                let result = expr.eval(state);
                state.set_lexical_context(was_lexical);
                result
            }

            Self::Alt(alternatives) => {
                for alternative in alternatives {
                    if alternative.eval(state)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Self::Seq(factors) => {
                for factor in factors {
                    if !factor.eval(state)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Self::Iter { expr, min, max } => eval_iter(state, expr, *min, *max),

            Self::Not(expr) => {
                let orig_pos = state.pos();
                state.failures.suppress();
                let result = expr.eval(state);
                state.failures.unsuppress();
                if result? {
                    state.record_failure(orig_pos, expected_of(self));
                    Ok(false)
                } else {
                    Ok(true)
                }
            }

            Self::Lookahead(expr) => {
                let orig_pos = state.pos();
                if expr.eval(state)? {
                    state.set_pos(orig_pos);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }

            Self::Arr(expr) => {
                let orig_pos = state.pos();
                let items = match state.stream().peek() {
                    Some(Atom::Value(Value::List(items))) => items.clone(),
                    _ => {
                        state.record_failure(orig_pos, expected_of(self));
                        return Ok(false);
                    }
                };
                state.set_pos(orig_pos + 1);
                let bindings_mark = state.bindings_len();
                state.push_stream(InputStream::from_values(items));
                let matched = expr.eval(state)? && Self::End.eval(state)?;
                if matched {
                    state.pop_binding();
                }
                state.pop_stream();
                state.truncate_bindings(bindings_mark);
                Ok(matched)
            }

            Self::Str(expr) => {
                let orig_pos = state.pos();
                let text = match state.stream().peek() {
                    Some(Atom::Value(Value::Str(text))) => text.clone(),
                    _ => {
                        state.record_failure(orig_pos, expected_of(self));
                        return Ok(false);
                    }
                };
                state.set_pos(orig_pos + 1);
                let bindings_mark = state.bindings_len();
                state.push_stream(InputStream::from_str(&text));
                let matched = expr.eval(state)? && Self::End.eval(state)?;
                if matched {
                    state.pop_binding();
                }
                state.pop_stream();
                state.truncate_bindings(bindings_mark);
                Ok(matched)
            }

            Self::Obj {
                properties,
                lenient,
            } => eval_obj(state, properties, *lenient, self),

            Self::Apply(app) => super::apply::eval_apply(app, state),
        }
    }
}

fn eval_iter(
    state: &mut EvalState<'_>,
    expr: &PExpr,
    min: usize,
    max: Option<usize>,
) -> Result<bool, MatchError> {
    let orig_pos = state.pos();
    let columns = expr.arity();
    let mut count = 0;

    loop {
        if max.is_some_and(|max| count >= max) {
            break;
        }
        let pos_before = state.pos();
        if !expr.eval(state)? {
            break;
        }
        count += 1;
        // A zero-width match would repeat forever; keep it once and stop.
        if state.pos() == pos_before {
            break;
        }
    }

    if count < min {
        return Ok(false);
    }

    let interval = state.stream().interval_to(orig_pos, state.pos());
    let matched = state.drain_last_bindings(count * columns);
    for column in 0..columns {
        let children = matched
            .iter()
            .skip(column)
            .step_by(columns.max(1))
            .cloned()
            .collect();
        state.push_binding(ParseNode::iteration(children, interval.clone()));
    }
    Ok(true)
}

fn eval_obj(
    state: &mut EvalState<'_>,
    properties: &[PropPattern],
    lenient: bool,
    whole: &PExpr,
) -> Result<bool, MatchError> {
    let orig_pos = state.pos();
    let map = match state.stream().peek() {
        Some(Atom::Value(Value::Map(map))) => map.clone(),
        _ => {
            state.record_failure(orig_pos, expected_of(whole));
            return Ok(false);
        }
    };
    state.set_pos(orig_pos + 1);
    let bindings_mark = state.bindings_len();

    for prop in properties {
        let Some(value) = map.get(prop.name.as_str()) else {
            state.record_failure(orig_pos, expected_of(whole));
            return Ok(false);
        };
        state.push_stream(InputStream::from_values(vec![value.clone()]));
        let matched = prop.pattern.eval(state)? && state.stream().at_end();
        state.pop_stream();
        if !matched {
            return Ok(false);
        }
    }

    state.truncate_bindings(bindings_mark);
    if lenient {
        let remainder: ValueMap = map
            .iter()
            .filter(|(name, _)| !properties.iter().any(|p| p.name == **name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let interval = state.stream().interval_to(orig_pos, orig_pos + 1);
        state.push_binding(ParseNode::terminal(Some(Value::Map(remainder)), interval));
        Ok(true)
    } else {
        Ok(map.len() == properties.len())
    }
}

/// Consume one atom as a value: code points become one-character strings.
fn take_atom(state: &mut EvalState<'_>) -> Option<Value> {
    let value = match state.stream().peek()? {
        Atom::Char(c) => Value::Str(char_text(c)),
        Atom::Value(v) => v.clone(),
    };
    let pos = state.pos();
    state.set_pos(pos + 1);
    Some(value)
}

fn char_text(c: char) -> CompactString {
    let mut text = CompactString::default();
    text.push(c);
    text
}

fn single_char(value: &Value) -> Option<char> {
    let text = value.as_str()?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// The expected-set descriptor an expression records when it fails.
pub(super) fn expected_of(expr: &PExpr) -> Expected {
    match expr {
        PExpr::Anything => Expected::Pattern("any object".into()),
        PExpr::End => Expected::EndOfInput,
        PExpr::StringPrim(text) => Expected::Literal(text.clone()),
        PExpr::Prim(Value::Str(text)) => Expected::Literal(text.clone()),
        PExpr::Not(inner) => Expected::Negation(inner.to_string().into()),
        other => Expected::Pattern(other.to_string().into()),
    }
}

//! Rule application: packrat memoization and seed-growing left recursion.
//!
//! Applying a rule consults the [`PosInfo`](super::state::PosInfo) at the
//! current position. A memoized record is replayed outright. An
//! application that is already active at the position is a left-recursion
//! cycle: the first detection installs a failure seed and opens a frame;
//! the head of the frame then grows the seed by reparsing its body until
//! the match stops getting longer (the greatest fixpoint of the end
//! position). Applications involved in an unconverged frame are not
//! memoized, since their results depend on the seed.

use crate::grammar::{PExpr, Rule, RuleApplication};
use crate::tree::{ParseNode, SharedNode};

use compact_str::CompactString;
use smallvec::SmallVec;

use super::failure::Expected;
use super::state::{AppliedRule, EvalState, MemoKey};
use super::MatchError;

pub(super) fn eval_apply(
    app_expr: &RuleApplication,
    state: &mut EvalState<'_>,
) -> Result<bool, MatchError> {
    let grammar = state.grammar;

    // Substitute the caller's actuals into our argument expressions, so
    // the application (and its memo key) is fully concrete.
    let app = if app_expr.args.iter().any(PExpr::references_params) {
        let actuals: Vec<PExpr> = state
            .current_application()
            .map(|applied| applied.app.args.to_vec())
            .unwrap_or_default();
        let args = app_expr
            .args
            .iter()
            .map(|arg| arg.substitute_params(&actuals))
            .collect::<Result<SmallVec<_>, usize>>()
            .map_err(MatchError::ParamIndexOutOfRange)?;
        RuleApplication {
            rule: app_expr.rule.clone(),
            args,
        }
    } else {
        app_expr.clone()
    };

    let Some(rule) = grammar.rule(&app.rule) else {
        return Err(MatchError::UnknownRule(app.rule.clone()));
    };
    if app.args.len() != rule.param_count() {
        return Err(MatchError::WrongNumberOfArguments {
            rule: app.rule.clone(),
            expected: rule.param_count(),
            found: app.args.len(),
        });
    }

    // Skip whitespace unless we *are* the whitespace rule.
    if app.rule != grammar.spaces_application().rule
        && ((app.is_syntactic() && !state.in_lexical_context()) || state.in_syntactic_context())
    {
        state.skip_spaces()?;
    }

    let key = state.intern_key(&app);
    let pos = state.pos();

    if state.is_active_at(pos, key) {
        return handle_cycle(state, key, pos);
    }
    if let Some(snapshot) = state.memo_lookup(pos, key) {
        return Ok(state.use_memoized(snapshot));
    }
    really_eval(state, rule, app, key, pos)
}

/// An application re-entered while already active: left recursion.
///
/// On first detection, memoize a failure seed and open an LR frame; the
/// enclosing head invocation will observe the placeholder and grow it.
/// When the cycle belongs to the current frame's head, refresh the
/// involved-application set first (applications entered during growth
/// also depend on the seed).
fn handle_cycle(state: &mut EvalState<'_>, key: MemoKey, pos: usize) -> Result<bool, MatchError> {
    if state.current_lr_head(pos) == Some(key) {
        state.update_involved_applications(pos);
    } else if !state.memo_contains(pos, key) {
        state.start_left_recursion(pos, key);
    }
    let snapshot = state
        .memo_lookup(pos, key)
        .expect("active application cycle without a memo record");
    Ok(state.use_memoized(snapshot))
}

fn really_eval(
    state: &mut EvalState<'_>,
    rule: &Rule,
    app: RuleApplication,
    key: MemoKey,
    orig_pos: usize,
) -> Result<bool, MatchError> {
    let is_top_level = state.current_application().is_none();
    let syntactic = app.is_syntactic();
    let rule_name = app.rule.clone();
    let body = rule.body();

    state.enter_application(AppliedRule { app, syntactic })?;
    state.enter_at(orig_pos, key);

    // A described rule reports as a single unit: failures inside its body
    // are collapsed into one synthetic failure labeled by the rule.
    let described = rule.description().is_some();
    if described {
        state.failures.suppress();
    }

    let mut value = eval_once(state, body, &rule_name, orig_pos)?;

    let mut grew_seed = false;
    let mut memoized = false;
    if state.current_lr_head(orig_pos) == Some(key) {
        // A frame was opened inside us and we are its head.
        value = grow_seed_result(state, body, &rule_name, orig_pos, key, value)?;
        state.end_left_recursion(orig_pos);
        grew_seed = true;
    } else if state.is_involved_in_lr(orig_pos, key) {
        // Involved in an unconverged frame: the result depends on the
        // seed, so it must not be memoized.
    } else {
        state.memoize(orig_pos, key, state.pos(), value.clone());
        memoized = true;
    }

    if described {
        state.failures.unsuppress();
        if value.is_none() {
            state.record_failure(
                orig_pos,
                Expected::Rule {
                    name: rule_name.clone(),
                    description: rule.description().map(Into::into),
                },
            );
        }
    }

    state.exit_at(orig_pos, key);
    state.exit_application();

    let succeeded = match value {
        Some(node) => {
            state.push_binding(node);
            if is_top_level {
                if syntactic && !state.in_lexical_context() {
                    state.skip_spaces()?;
                }
                let at_end = PExpr::End.eval(state)?;
                if at_end {
                    state.pop_binding();
                }
                at_end
            } else {
                true
            }
        }
        None => false,
    };

    // Trace hooks are armed last: anything evaluated above (spaces, the
    // top-level end check) runs its own wrapper and would consume them.
    if state.tracing() {
        if grew_seed {
            state.mark_left_recursive();
        }
        if grew_seed || memoized {
            state.set_memo_trace_target(orig_pos, key);
        }
    }
    Ok(succeeded)
}

/// Evaluate the rule body once, splicing its bindings into a rule node.
fn eval_once(
    state: &mut EvalState<'_>,
    body: &PExpr,
    rule_name: &CompactString,
    orig_pos: usize,
) -> Result<Option<SharedNode>, MatchError> {
    if body.eval(state)? {
        let children = state.drain_last_bindings(body.arity());
        let interval = state.stream().interval_to(orig_pos, state.pos());
        Ok(Some(ParseNode::rule(rule_name.clone(), children, interval)))
    } else {
        Ok(None)
    }
}

/// Grow a left-recursion seed to the longest match.
///
/// The seed (the first full body evaluation) is committed into the memo
/// record, then the body is reparsed from `orig_pos`; each strictly
/// longer result is committed and the loop repeats. The first attempt
/// that makes no progress is discarded and growing stops. A failed seed
/// means the whole rule fails and the placeholder stays as-is.
fn grow_seed_result(
    state: &mut EvalState<'_>,
    body: &PExpr,
    rule_name: &CompactString,
    orig_pos: usize,
    key: MemoKey,
    seed: Option<SharedNode>,
) -> Result<Option<SharedNode>, MatchError> {
    let Some(mut value) = seed else {
        return Ok(None);
    };

    loop {
        state.commit_seed(orig_pos, key, state.pos(), value.clone());
        state.set_pos(orig_pos);
        let attempt = eval_once(state, body, rule_name, orig_pos)?;
        let (committed_end, _) = state.seed_snapshot(orig_pos, key);
        match attempt {
            Some(longer) if state.pos() > committed_end => value = longer,
            _ => {
                if state.tracing() {
                    state.drop_last_trace_entry();
                }
                break;
            }
        }
    }

    let (end_pos, grown) = state.seed_snapshot(orig_pos, key);
    state.set_pos(end_pos);
    Ok(grown)
}

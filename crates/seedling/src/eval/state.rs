//! Mutable evaluation state.
//!
//! One [`EvalState`] exists per top-level parse. It owns the stream stack
//! (nested matching pushes fresh streams), the bindings stack, a
//! per-stream per-position [`PosInfo`] table, the failure tracker, the
//! application chain and the optional trace.
//!
//! `PosInfo` exists for every input position touched by a rule
//! application. It carries the stack of applications currently active at
//! that position, the packrat memo table, and the left-recursion frames.
//! Frames live in an owned vector and are referenced by index; the seed
//! memo record stores the frame index rather than a pointer.

use hashbrown::HashMap;
use lasso::Rodeo;

use crate::grammar::{Grammar, PExpr, RuleApplication};
use crate::input::InputStream;
use crate::tree::SharedNode;

use super::failure::{Expected, FailureTracker};
use super::trace::TraceEntry;
use super::MatchError;

/// Interned memo key: the canonical `rule<arg1,...>` text of a
/// fully-substituted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey(lasso::Spur);

/// A packrat memo record.
///
/// `value: None` is a memoized failure. A record whose `lr_frame` is set
/// started life as a left-recursion seed; while growing, `end_pos` and
/// `value` hold the last committed (longest so far) result.
#[derive(Debug)]
pub(crate) struct MemoRec {
    pub end_pos: usize,
    pub value: Option<SharedNode>,
    pub lr_frame: Option<usize>,
    pub trace: Option<TraceEntry>,
}

/// Cheap copy of a memo record, used to replay it.
pub(crate) struct MemoSnapshot {
    pub end_pos: usize,
    pub value: Option<SharedNode>,
    pub trace: Option<TraceEntry>,
}

/// One left-recursion frame.
#[derive(Debug)]
pub(crate) struct LrFrame {
    pub head: MemoKey,
    /// Memo keys of applications evaluated strictly inside the head.
    involved: Vec<MemoKey>,
    /// Index into the application stack where involvement starts.
    first_involved_index: usize,
    /// Enclosing frame, forming a stack.
    enclosing: Option<usize>,
}

/// Per-position bookkeeping: active applications, memo table, LR frames.
#[derive(Debug, Default)]
pub(crate) struct PosInfo {
    application_stack: Vec<MemoKey>,
    memo: HashMap<MemoKey, MemoRec, ahash::RandomState>,
    lr_frames: Vec<LrFrame>,
    current_lr: Option<usize>,
}

impl PosInfo {
    fn enter(&mut self, key: MemoKey) {
        self.application_stack.push(key);
    }

    fn exit(&mut self, key: MemoKey) {
        let popped = self.application_stack.pop();
        debug_assert_eq!(popped, Some(key), "application stack out of balance");
    }

    fn is_active(&self, key: MemoKey) -> bool {
        self.application_stack.contains(&key)
    }

    /// Open a new LR frame for `head`. The involved applications are the
    /// suffix of the application stack strictly inside the head.
    fn start_left_recursion(&mut self, head: MemoKey) -> usize {
        let first_involved_index = self
            .application_stack
            .iter()
            .position(|k| *k == head)
            .map_or(self.application_stack.len(), |i| i + 1);
        let involved = self.application_stack[first_involved_index..].to_vec();
        let index = self.lr_frames.len();
        self.lr_frames.push(LrFrame {
            head,
            involved,
            first_involved_index,
            enclosing: self.current_lr,
        });
        self.current_lr = Some(index);
        index
    }

    fn end_left_recursion(&mut self) {
        let index = self.current_lr.expect("no left recursion to end");
        self.current_lr = self.lr_frames[index].enclosing;
    }

    /// Append applications entered since the current frame began. Called
    /// while growing the seed, so involvement stays complete.
    fn update_involved(&mut self) {
        let Some(index) = self.current_lr else { return };
        let frame = &mut self.lr_frames[index];
        for key in &self.application_stack[frame.first_involved_index..] {
            if !frame.involved.contains(key) {
                frame.involved.push(*key);
            }
        }
    }

    fn current_lr_head(&self) -> Option<MemoKey> {
        self.current_lr.map(|i| self.lr_frames[i].head)
    }

    fn is_involved(&self, key: MemoKey) -> bool {
        self.current_lr
            .is_some_and(|i| self.lr_frames[i].involved.contains(&key))
    }
}

/// A stream plus the PosInfo table for its positions.
#[derive(Debug)]
struct StreamFrame {
    stream: InputStream,
    pos_infos: HashMap<usize, PosInfo, ahash::RandomState>,
}

impl StreamFrame {
    fn new(stream: InputStream) -> Self {
        Self {
            stream,
            pos_infos: HashMap::with_hasher(ahash::RandomState::new()),
        }
    }
}

/// One entry of the application chain.
#[derive(Debug)]
pub(crate) struct AppliedRule {
    pub app: RuleApplication,
    pub syntactic: bool,
}

/// The top-level parse state.
pub(crate) struct EvalState<'g> {
    pub(crate) grammar: &'g Grammar,
    streams: Vec<StreamFrame>,
    bindings: Vec<SharedNode>,
    pub(crate) failures: FailureTracker,
    application_chain: Vec<AppliedRule>,
    /// One entry per application-chain frame (plus one for the top
    /// level); the top entry is flipped by lexical (`#(...)`) scopes.
    lexical_stack: Vec<bool>,
    memo_keys: Rodeo,
    spaces_expr: PExpr,
    depth: usize,
    max_depth: usize,

    tracing: bool,
    trace_collectors: Vec<Vec<TraceEntry>>,
    replay_mark: bool,
    lr_mark: bool,
    memo_trace_target: Option<(usize, MemoKey)>,
}

impl<'g> EvalState<'g> {
    pub(crate) fn new(
        grammar: &'g Grammar,
        stream: InputStream,
        max_depth: usize,
        tracing: bool,
    ) -> Self {
        Self {
            grammar,
            streams: vec![StreamFrame::new(stream)],
            bindings: Vec::new(),
            failures: FailureTracker::new(),
            application_chain: Vec::new(),
            lexical_stack: vec![false],
            memo_keys: Rodeo::new(),
            spaces_expr: PExpr::Apply(Box::new(grammar.spaces_application().clone())),
            depth: 0,
            max_depth,
            tracing,
            trace_collectors: if tracing { vec![Vec::new()] } else { Vec::new() },
            replay_mark: false,
            lr_mark: false,
            memo_trace_target: None,
        }
    }

    // --- stream stack ---

    fn frame(&self) -> &StreamFrame {
        self.streams.last().expect("stream stack underflow")
    }

    fn frame_mut(&mut self) -> &mut StreamFrame {
        self.streams.last_mut().expect("stream stack underflow")
    }

    pub(crate) fn stream(&self) -> &InputStream {
        &self.frame().stream
    }

    pub(crate) fn stream_mut(&mut self) -> &mut InputStream {
        &mut self.frame_mut().stream
    }

    pub(crate) fn pos(&self) -> usize {
        self.stream().pos()
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.stream_mut().set_pos(pos);
    }

    pub(crate) fn push_stream(&mut self, stream: InputStream) {
        self.streams.push(StreamFrame::new(stream));
    }

    pub(crate) fn pop_stream(&mut self) {
        debug_assert!(self.streams.len() > 1, "cannot pop the root stream");
        self.streams.pop();
    }

    // --- bindings stack ---

    pub(crate) fn bindings_len(&self) -> usize {
        self.bindings.len()
    }

    pub(crate) fn truncate_bindings(&mut self, len: usize) {
        debug_assert!(len <= self.bindings.len(), "bindings stack underflow");
        self.bindings.truncate(len);
    }

    pub(crate) fn push_binding(&mut self, node: SharedNode) {
        self.bindings.push(node);
    }

    pub(crate) fn pop_binding(&mut self) -> SharedNode {
        self.bindings.pop().expect("bindings stack underflow")
    }

    /// Remove and return the topmost `count` bindings, oldest first.
    pub(crate) fn drain_last_bindings(&mut self, count: usize) -> Vec<SharedNode> {
        debug_assert!(count <= self.bindings.len(), "bindings stack underflow");
        self.bindings.split_off(self.bindings.len() - count)
    }

    // --- context ---

    pub(crate) fn current_application(&self) -> Option<&AppliedRule> {
        self.application_chain.last()
    }

    pub(crate) fn enter_application(&mut self, applied: AppliedRule) -> Result<(), MatchError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(MatchError::DepthLimit(self.max_depth));
        }
        self.application_chain.push(applied);
        self.lexical_stack.push(false);
        Ok(())
    }

    pub(crate) fn exit_application(&mut self) {
        self.depth -= 1;
        self.application_chain.pop();
        self.lexical_stack.pop();
    }

    pub(crate) fn in_lexical_context(&self) -> bool {
        *self.lexical_stack.last().expect("lexical stack underflow")
    }

    /// Set the lexical flag of the current context, returning the old one.
    pub(crate) fn set_lexical_context(&mut self, lexical: bool) -> bool {
        let top = self.lexical_stack.last_mut().expect("lexical stack underflow");
        std::mem::replace(top, lexical)
    }

    /// Syntactic context: the current application is a syntactic rule and
    /// no lexical scope is active.
    pub(crate) fn in_syntactic_context(&self) -> bool {
        self.current_application()
            .is_some_and(|a| a.syntactic && !self.in_lexical_context())
    }

    // --- whitespace skipping ---

    /// Evaluate the grammar's whitespace rule and drop its binding.
    /// Failure recordings made by the rule are discarded.
    pub(crate) fn skip_spaces(&mut self) -> Result<(), MatchError> {
        self.failures.push_scope();
        let spaces = self.spaces_expr.clone();
        if spaces.eval(self)? {
            self.bindings.pop();
        }
        self.failures.pop_scope();
        Ok(())
    }

    pub(crate) fn skip_spaces_if_in_syntactic_context(&mut self) -> Result<(), MatchError> {
        if self.in_syntactic_context() {
            self.skip_spaces()?;
        }
        Ok(())
    }

    // --- failures ---

    pub(crate) fn record_failure(&mut self, pos: usize, expected: Expected) {
        self.failures.record(pos, expected);
    }

    // --- memo keys & PosInfo ---

    pub(crate) fn intern_key(&mut self, app: &RuleApplication) -> MemoKey {
        MemoKey(self.memo_keys.get_or_intern(app.memo_key_text().as_str()))
    }

    #[cfg(test)]
    pub(crate) fn resolve_key(&self, key: MemoKey) -> &str {
        self.memo_keys.resolve(&key.0)
    }

    fn pos_info_mut(&mut self, pos: usize) -> &mut PosInfo {
        self.frame_mut().pos_infos.entry(pos).or_default()
    }

    fn pos_info(&self, pos: usize) -> Option<&PosInfo> {
        self.frame().pos_infos.get(&pos)
    }

    pub(crate) fn is_active_at(&self, pos: usize, key: MemoKey) -> bool {
        self.pos_info(pos).is_some_and(|p| p.is_active(key))
    }

    pub(crate) fn enter_at(&mut self, pos: usize, key: MemoKey) {
        self.pos_info_mut(pos).enter(key);
    }

    pub(crate) fn exit_at(&mut self, pos: usize, key: MemoKey) {
        self.pos_info_mut(pos).exit(key);
    }

    pub(crate) fn memo_contains(&self, pos: usize, key: MemoKey) -> bool {
        self.pos_info(pos).is_some_and(|p| p.memo.contains_key(&key))
    }

    pub(crate) fn memo_lookup(&self, pos: usize, key: MemoKey) -> Option<MemoSnapshot> {
        let rec = self.pos_info(pos)?.memo.get(&key)?;
        Some(MemoSnapshot {
            end_pos: rec.end_pos,
            value: rec.value.clone(),
            trace: rec.trace.clone(),
        })
    }

    pub(crate) fn memoize(&mut self, pos: usize, key: MemoKey, end_pos: usize, value: Option<SharedNode>) {
        let info = self.pos_info_mut(pos);
        debug_assert!(
            !info.memo.contains_key(&key),
            "conflicting memo records for one key"
        );
        info.memo.insert(
            key,
            MemoRec {
                end_pos,
                value,
                lr_frame: None,
                trace: None,
            },
        );
    }

    // --- left recursion ---

    pub(crate) fn current_lr_head(&self, pos: usize) -> Option<MemoKey> {
        self.pos_info(pos).and_then(PosInfo::current_lr_head)
    }

    pub(crate) fn is_involved_in_lr(&self, pos: usize, key: MemoKey) -> bool {
        self.pos_info(pos).is_some_and(|p| p.is_involved(key))
    }

    /// First detection of left recursion at `pos`: install the seed
    /// record (a failure at the detection position) and open a frame.
    pub(crate) fn start_left_recursion(&mut self, pos: usize, key: MemoKey) {
        let info = self.pos_info_mut(pos);
        let frame = info.start_left_recursion(key);
        info.memo.insert(
            key,
            MemoRec {
                end_pos: pos,
                value: None,
                lr_frame: Some(frame),
                trace: None,
            },
        );
    }

    pub(crate) fn end_left_recursion(&mut self, pos: usize) {
        self.pos_info_mut(pos).end_left_recursion();
    }

    pub(crate) fn update_involved_applications(&mut self, pos: usize) {
        self.pos_info_mut(pos).update_involved();
    }

    /// Commit a strictly longer seed result.
    pub(crate) fn commit_seed(&mut self, pos: usize, key: MemoKey, end_pos: usize, value: SharedNode) {
        let rec = self
            .pos_info_mut(pos)
            .memo
            .get_mut(&key)
            .expect("seed record missing");
        rec.end_pos = end_pos;
        rec.value = Some(value);
    }

    pub(crate) fn seed_snapshot(&self, pos: usize, key: MemoKey) -> (usize, Option<SharedNode>) {
        let rec = &self.pos_info(pos).expect("seed record missing").memo[&key];
        (rec.end_pos, rec.value.clone())
    }

    /// Replay a memo record: move the cursor, push the value if any,
    /// reproduce the stored trace.
    pub(crate) fn use_memoized(&mut self, snapshot: MemoSnapshot) -> bool {
        self.set_pos(snapshot.end_pos);
        if self.tracing {
            if let Some(entry) = snapshot.trace {
                self.append_trace(entry);
            }
            self.replay_mark = true;
        }
        match snapshot.value {
            Some(node) => {
                self.bindings.push(node);
                true
            }
            None => false,
        }
    }

    // --- tracing ---

    pub(crate) fn tracing(&self) -> bool {
        self.tracing
    }

    pub(crate) fn push_trace_collector(&mut self) {
        self.trace_collectors.push(Vec::new());
    }

    pub(crate) fn pop_trace_collector(&mut self) -> Vec<TraceEntry> {
        self.trace_collectors.pop().expect("trace collector underflow")
    }

    pub(crate) fn append_trace(&mut self, entry: TraceEntry) {
        if let Some(collector) = self.trace_collectors.last_mut() {
            collector.push(entry);
        }
    }

    /// Drop the most recent sibling entry (the unused last attempt of a
    /// seed-growing loop).
    pub(crate) fn drop_last_trace_entry(&mut self) {
        if let Some(collector) = self.trace_collectors.last_mut() {
            collector.pop();
        }
    }

    pub(crate) fn take_replay_mark(&mut self) -> bool {
        std::mem::take(&mut self.replay_mark)
    }

    pub(crate) fn mark_left_recursive(&mut self) {
        self.lr_mark = true;
    }

    pub(crate) fn take_lr_mark(&mut self) -> bool {
        std::mem::take(&mut self.lr_mark)
    }

    /// Ask the eval wrapper to store the entry it is about to build into
    /// the memo record at `(pos, key)` of the current stream.
    pub(crate) fn set_memo_trace_target(&mut self, pos: usize, key: MemoKey) {
        self.memo_trace_target = Some((pos, key));
    }

    pub(crate) fn take_memo_trace_target(&mut self) -> Option<(usize, MemoKey)> {
        self.memo_trace_target.take()
    }

    pub(crate) fn attach_memo_trace(&mut self, pos: usize, key: MemoKey, entry: TraceEntry) {
        if let Some(rec) = self.pos_info_mut(pos).memo.get_mut(&key) {
            rec.trace = Some(entry);
        }
    }

    /// The root trace entry, once evaluation has finished.
    pub(crate) fn finish_trace(&mut self) -> Option<TraceEntry> {
        self.trace_collectors.pop().and_then(|mut c| c.pop())
    }
}

//! Rightmost-failure tracking.
//!
//! A parse failure is not an error: the evaluator records, per parse, the
//! rightmost input position at which any expression failed together with
//! the set of expressions that were expected there. Recording can be
//! suppressed in counted scopes (negative lookahead, described rules) and
//! isolated entirely (whitespace skipping).

use std::fmt;
use std::mem;

use compact_str::CompactString;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// What the parse expected at the failure position.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Expected {
    /// An exact literal.
    Literal(CompactString),
    /// A pattern descriptor (range, category, structural shape).
    Pattern(CompactString),
    /// A rule, reported by its description when it has one.
    Rule {
        name: CompactString,
        description: Option<CompactString>,
    },
    /// The negation of an expression (`~e` succeeded where it must not).
    Negation(CompactString),
    /// End of input.
    EndOfInput,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s:?}"),
            Self::Pattern(p) => write!(f, "{p}"),
            Self::Rule { name, description } => match description {
                Some(d) => write!(f, "{d}"),
                None => write!(f, "{name}"),
            },
            Self::Negation(p) => write!(f, "not {p}"),
            Self::EndOfInput => write!(f, "end of input"),
        }
    }
}

/// Tracks the rightmost failure set for one parse.
#[derive(Debug, Default)]
pub(crate) struct FailureTracker {
    rightmost: Option<usize>,
    expected: Vec<Expected>,
    suppression: u32,
    scopes: Vec<(Option<usize>, Vec<Expected>)>,
}

impl FailureTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record `expected` as having failed at `pos`. Only the rightmost
    /// position's set is retained; duplicates are dropped.
    pub(crate) fn record(&mut self, pos: usize, expected: Expected) {
        if self.suppression > 0 {
            return;
        }
        match self.rightmost {
            Some(rightmost) if pos < rightmost => {}
            Some(rightmost) if pos == rightmost => {
                if !self.expected.contains(&expected) {
                    self.expected.push(expected);
                }
            }
            _ => {
                self.rightmost = Some(pos);
                self.expected.clear();
                self.expected.push(expected);
            }
        }
    }

    /// Enter a counted no-recording scope.
    pub(crate) fn suppress(&mut self) {
        self.suppression += 1;
    }

    /// Leave a counted no-recording scope.
    pub(crate) fn unsuppress(&mut self) {
        debug_assert!(self.suppression > 0, "suppression scope underflow");
        self.suppression = self.suppression.saturating_sub(1);
    }

    /// Set aside the current failure info, to be restored by
    /// [`pop_scope`](Self::pop_scope). Recordings in between are discarded
    /// wholesale (used around whitespace skipping).
    pub(crate) fn push_scope(&mut self) {
        self.scopes
            .push((self.rightmost.take(), mem::take(&mut self.expected)));
    }

    pub(crate) fn pop_scope(&mut self) {
        let (rightmost, expected) = self.scopes.pop().expect("failure scope underflow");
        self.rightmost = rightmost;
        self.expected = expected;
    }

    /// The rightmost failure position and its expected set.
    pub(crate) fn into_summary(self) -> (usize, Vec<Expected>) {
        (self.rightmost.unwrap_or(0), self.expected)
    }

    #[cfg(test)]
    pub(crate) fn rightmost(&self) -> Option<usize> {
        self.rightmost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rightmost_wins() {
        let mut tracker = FailureTracker::new();
        tracker.record(1, Expected::Literal("a".into()));
        tracker.record(3, Expected::Literal("b".into()));
        tracker.record(2, Expected::Literal("c".into()));
        let (pos, expected) = tracker.into_summary();
        assert_eq!(pos, 3);
        assert_eq!(expected, vec![Expected::Literal("b".into())]);
    }

    #[test]
    fn test_same_position_accumulates_without_duplicates() {
        let mut tracker = FailureTracker::new();
        tracker.record(2, Expected::Literal("a".into()));
        tracker.record(2, Expected::EndOfInput);
        tracker.record(2, Expected::Literal("a".into()));
        let (pos, expected) = tracker.into_summary();
        assert_eq!(pos, 2);
        assert_eq!(
            expected,
            vec![Expected::Literal("a".into()), Expected::EndOfInput]
        );
    }

    #[test]
    fn test_suppression_is_counted() {
        let mut tracker = FailureTracker::new();
        tracker.suppress();
        tracker.suppress();
        tracker.record(1, Expected::EndOfInput);
        tracker.unsuppress();
        tracker.record(2, Expected::EndOfInput);
        tracker.unsuppress();
        tracker.record(3, Expected::EndOfInput);
        assert_eq!(tracker.rightmost(), Some(3));
    }

    #[test]
    fn test_scope_isolates_recordings() {
        let mut tracker = FailureTracker::new();
        tracker.record(1, Expected::Literal("a".into()));
        tracker.push_scope();
        tracker.record(9, Expected::Literal("ws".into()));
        tracker.pop_scope();
        let (pos, expected) = tracker.into_summary();
        assert_eq!(pos, 1);
        assert_eq!(expected, vec![Expected::Literal("a".into())]);
    }
}

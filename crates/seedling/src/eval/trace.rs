//! Structured evaluation traces.
//!
//! When tracing is enabled, every expression evaluation contributes one
//! [`TraceEntry`] to its parent's child list. Rule applications store
//! their entry into the packrat memo record, so memo replays reproduce
//! the trace of the original evaluation.

use std::fmt;

use compact_str::CompactString;

/// One evaluated expression in the trace tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    /// Input position the evaluation started at.
    pub pos: usize,
    /// Canonical descriptor of the evaluated expression.
    pub descriptor: CompactString,
    pub succeeded: bool,
    /// Entry was replayed from the memo table instead of evaluated.
    pub replayed_from_memo: bool,
    /// Entry is the head of a left-recursion frame.
    pub left_recursive: bool,
    pub children: Vec<TraceEntry>,
}

impl TraceEntry {
    pub(crate) fn new(
        pos: usize,
        descriptor: CompactString,
        succeeded: bool,
        children: Vec<TraceEntry>,
    ) -> Self {
        Self {
            pos,
            descriptor,
            succeeded,
            replayed_from_memo: false,
            left_recursive: false,
            children,
        }
    }

    /// Depth-first pre-order walk of this entry and its descendants.
    pub fn walk(&self, visit: &mut impl FnMut(&Self, usize)) {
        self.walk_at(visit, 0);
    }

    fn walk_at(&self, visit: &mut impl FnMut(&Self, usize), depth: usize) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(visit, depth + 1);
        }
    }

    fn fmt_at(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let mark = if self.succeeded { "✓" } else { "✗" };
        let memo = if self.replayed_from_memo { " (memo)" } else { "" };
        let lr = if self.left_recursive { " (lr)" } else { "" };
        writeln!(
            f,
            "{:indent$}{mark} {} @ {}{memo}{lr}",
            "",
            self.descriptor,
            self.pos,
            indent = depth * 2
        )?;
        for child in &self.children {
            child.fmt_at(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_at(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_preorder() {
        let leaf = TraceEntry::new(1, "\"a\"".into(), true, vec![]);
        let root = TraceEntry::new(0, "start".into(), true, vec![leaf]);
        let mut seen = Vec::new();
        root.walk(&mut |entry, depth| seen.push((entry.pos, depth)));
        assert_eq!(seen, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_display_is_indented() {
        let leaf = TraceEntry::new(0, "\"a\"".into(), false, vec![]);
        let root = TraceEntry::new(0, "start".into(), false, vec![leaf]);
        let rendered = root.to_string();
        assert!(rendered.contains("✗ start @ 0"));
        assert!(rendered.contains("  ✗ \"a\" @ 0"));
    }
}

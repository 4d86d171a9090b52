//! Parse-tree nodes.
//!
//! Successful matches build an immutable tree of [`ParseNode`]s. Nodes are
//! shared via `Arc`: the packrat memo table and the seed-growing machinery
//! replay previously built subtrees without copying them.

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;

use crate::input::Interval;
use crate::value::Value;

/// A shared parse-tree node.
pub type SharedNode = Arc<ParseNode>;

/// A node of the parse tree.
#[derive(Debug, PartialEq)]
pub enum ParseNode {
    /// A successful rule application, labeled with the rule name.
    Rule {
        name: CompactString,
        children: Vec<SharedNode>,
        interval: Interval,
    },
    /// A leaf carrying the matched value. `value` is `None` for the
    /// synthetic end-of-input leaf.
    Terminal {
        value: Option<Value>,
        interval: Interval,
    },
    /// The spliced repetitions of one binding column of an iteration.
    Iter {
        children: Vec<SharedNode>,
        interval: Interval,
    },
}

impl ParseNode {
    pub(crate) fn rule(
        name: CompactString,
        children: Vec<SharedNode>,
        interval: Interval,
    ) -> SharedNode {
        Arc::new(Self::Rule {
            name,
            children,
            interval,
        })
    }

    pub(crate) fn terminal(value: Option<Value>, interval: Interval) -> SharedNode {
        Arc::new(Self::Terminal { value, interval })
    }

    pub(crate) fn iteration(children: Vec<SharedNode>, interval: Interval) -> SharedNode {
        Arc::new(Self::Iter { children, interval })
    }

    /// The source span this node was matched from.
    #[must_use]
    pub const fn interval(&self) -> &Interval {
        match self {
            Self::Rule { interval, .. }
            | Self::Terminal { interval, .. }
            | Self::Iter { interval, .. } => interval,
        }
    }

    /// Rule name for rule nodes, `"_iter"` for iterations, `"_terminal"`
    /// for leaves.
    #[must_use]
    pub fn ctor_name(&self) -> &str {
        match self {
            Self::Rule { name, .. } => name,
            Self::Terminal { .. } => "_terminal",
            Self::Iter { .. } => "_iter",
        }
    }

    #[must_use]
    pub fn children(&self) -> &[SharedNode] {
        match self {
            Self::Rule { children, .. } | Self::Iter { children, .. } => children,
            Self::Terminal { .. } => &[],
        }
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<&SharedNode> {
        self.children().get(index)
    }

    #[must_use]
    pub fn num_children(&self) -> usize {
        self.children().len()
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    #[must_use]
    pub const fn is_iteration(&self) -> bool {
        matches!(self, Self::Iter { .. })
    }

    /// The matched value of a terminal leaf.
    #[must_use]
    pub const fn terminal_value(&self) -> Option<&Value> {
        match self {
            Self::Terminal {
                value: Some(value), ..
            } => Some(value),
            _ => None,
        }
    }

    /// The matched source text, when the node spans a textual stream.
    #[must_use]
    pub fn source_text(&self) -> Option<CompactString> {
        self.interval().text()
    }
}

impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule { name, children, .. } => {
                write!(f, "{name}(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Self::Terminal { value: Some(v), .. } => write!(f, "{v}"),
            Self::Terminal { value: None, .. } => write!(f, "end"),
            Self::Iter { children, .. } => {
                write!(f, "[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputStream;

    fn span(text: &str, start: usize, end: usize) -> Interval {
        let stream = InputStream::from_str(text);
        stream.interval_to(start, end)
    }

    #[test]
    fn test_terminal_leaf() {
        let node = ParseNode::terminal(Some(Value::str("a")), span("abc", 0, 1));
        assert!(node.is_terminal());
        assert_eq!(node.terminal_value(), Some(&Value::str("a")));
        assert_eq!(node.num_children(), 0);
        assert_eq!(node.ctor_name(), "_terminal");
    }

    #[test]
    fn test_rule_node_children() {
        let leaf = ParseNode::terminal(Some(Value::str("a")), span("ab", 0, 1));
        let node = ParseNode::rule("Start".into(), vec![leaf], span("ab", 0, 1));
        assert_eq!(node.ctor_name(), "Start");
        assert_eq!(node.num_children(), 1);
        assert_eq!(node.source_text().unwrap(), "a");
    }

    #[test]
    fn test_display_nests() {
        let a = ParseNode::terminal(Some(Value::str("a")), span("ab", 0, 1));
        let b = ParseNode::terminal(Some(Value::str("b")), span("ab", 1, 2));
        let iter = ParseNode::iteration(vec![a], span("ab", 0, 1));
        let node = ParseNode::rule("Start".into(), vec![iter, b], span("ab", 0, 2));
        assert_eq!(node.to_string(), "Start([\"a\"], \"b\")");
    }
}

//! Dynamically shaped input values.
//!
//! Matching is not limited to strings: a grammar can match over arbitrary
//! trees of lists, maps and primitives. `Value` is the tagged model for
//! those inputs; string atoms are handled separately as code points by
//! [`InputStream`](crate::input::InputStream).

use std::cmp::Ordering;
use std::fmt;

use compact_str::CompactString;
use hashbrown::HashMap;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Map payload of [`Value::Map`]. Keys are the value's own properties.
pub type ValueMap = HashMap<CompactString, Value, ahash::RandomState>;

/// An input value for structural matching.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(CompactString),
    List(Vec<Value>),
    Map(ValueMap),
}

impl Value {
    /// Build a [`Value::Str`] from anything string-like.
    pub fn str(s: impl AsRef<str>) -> Self {
        Self::Str(CompactString::new(s.as_ref()))
    }

    /// Build a [`Value::Map`] from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (CompactString::new(k.as_ref()), v))
                .collect(),
        )
    }

    #[must_use]
    pub const fn as_str(&self) -> Option<&CompactString> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Human-readable kind name, used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

/// Values order only within a primitive kind; cross-kind comparisons and
/// container comparisons yield `None`. `Range` matching relies on this.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(CompactString::new(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s.into())
    }
}

impl From<CompactString> for Value {
    fn from(s: CompactString) -> Self {
        Self::Str(s)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_kind_comparison_is_none() {
        assert_eq!(Value::Int(1).partial_cmp(&Value::Float(1.0)), None);
        assert_eq!(Value::str("a").partial_cmp(&Value::Int(97)), None);
        assert_eq!(
            Value::List(vec![]).partial_cmp(&Value::List(vec![])),
            None
        );
    }

    #[test]
    fn test_same_kind_comparison() {
        assert_eq!(
            Value::Int(1).partial_cmp(&Value::Int(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::str("b").partial_cmp(&Value::str("a")),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_map_builder() {
        let v = Value::map([("name", Value::str("a")), ("extra", Value::Int(7))]);
        let map = v.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("extra"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(vec![1i64, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::str("x").to_string(), "\"x\"");
    }
}

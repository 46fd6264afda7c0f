//! Index keys.

use alloc::vec::Vec;
use trellis_core::Value;

/// A key stored in an index: a single value or a tuple for composite indices.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Single(Value),
    Composite(Vec<Value>),
}

impl Key {
    /// Returns the key's components as a slice.
    pub fn values(&self) -> &[Value] {
        match self {
            Key::Single(v) => core::slice::from_ref(v),
            Key::Composite(vs) => vs,
        }
    }

    /// Returns the single value of a one-column key.
    pub fn as_single(&self) -> Option<&Value> {
        match self {
            Key::Single(v) => Some(v),
            Key::Composite(_) => None,
        }
    }

    /// True for a single-column null key.
    pub fn is_null(&self) -> bool {
        matches!(self, Key::Single(Value::Null))
    }

    /// True if any component is null.
    pub fn contains_null(&self) -> bool {
        self.values().iter().any(Value::is_null)
    }
}

impl From<Value> for Key {
    fn from(v: Value) -> Self {
        Key::Single(v)
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Single(Value::Int64(v))
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Single(Value::from(v))
    }
}

impl From<Vec<Value>> for Key {
    fn from(vs: Vec<Value>) -> Self {
        Key::Composite(vs)
    }
}

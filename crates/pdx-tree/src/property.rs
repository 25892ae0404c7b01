use std::fmt;

use serde::{Deserialize, Serialize};

/// A tree leaf's address: a human-readable dotted path and a compact binary
/// encoding of the same path.
///
/// The readable name (`"cd_tree.read_rules[0].action"`) is what callers use
/// to request proofs. The compact bytes are the canonical second name: tree
/// prefixes occupy the leading bytes, field ordinals the later bytes, and
/// concatenation composes a prefix with a leaf's own path. Transition rules
/// match on the compact form.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Property {
    readable: String,
    compact: Vec<u8>,
}

impl Property {
    /// Create a property from its readable name and compact bytes.
    pub fn new(readable: impl Into<String>, compact: Vec<u8>) -> Self {
        Self {
            readable: readable.into(),
            compact,
        }
    }

    /// A child field of this property: `parent.name`, compact bytes
    /// extended with the field's ordinal.
    pub fn field(&self, name: &str, ordinal: u16) -> Self {
        let readable = if self.readable.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.readable)
        };
        let mut compact = self.compact.clone();
        compact.extend_from_slice(&ordinal.to_be_bytes());
        Self { readable, compact }
    }

    /// An element of this property at `index`: `parent[index]`.
    pub fn index(&self, index: u16) -> Self {
        let mut compact = self.compact.clone();
        compact.extend_from_slice(&index.to_be_bytes());
        Self {
            readable: format!("{}[{index}]", self.readable),
            compact,
        }
    }

    /// The readable dotted path.
    pub fn readable(&self) -> &str {
        &self.readable
    }

    /// The compact binary path.
    pub fn compact(&self) -> &[u8] {
        &self.compact
    }

    /// The leading component of the readable path (`"cd_tree"` for
    /// `"cd_tree.roles[0]"`), used to route proof requests to the right
    /// subtree.
    pub fn prefix(&self) -> &str {
        match self.readable.split_once('.') {
            Some((head, _)) => head,
            None => &self.readable,
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property({})", self.readable)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.readable)
    }
}

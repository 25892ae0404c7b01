use serde::{Deserialize, Serialize};

use pdx_crypto::ContentHasher;
use pdx_types::Salt;

use crate::property::Property;

/// The payload of a single tree leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafContent {
    /// A value leaf: hashed as `H(compact_name ‖ value ‖ salt)`.
    Value { value: Vec<u8>, salt: Salt },
    /// A pre-hashed leaf, typically the root of another tree.
    Hashed { hash: [u8; 32] },
}

/// A named, salted merkle leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafNode {
    pub property: Property,
    pub content: LeafContent,
}

impl LeafNode {
    /// A value leaf.
    pub fn new(property: Property, value: Vec<u8>, salt: Salt) -> Self {
        Self {
            property,
            content: LeafContent::Value { value, salt },
        }
    }

    /// A pre-hashed leaf.
    pub fn hashed(property: Property, hash: [u8; 32]) -> Self {
        Self {
            property,
            content: LeafContent::Hashed { hash },
        }
    }

    /// The leaf's hash as it appears at level zero of the tree.
    pub fn leaf_hash(&self) -> [u8; 32] {
        match &self.content {
            LeafContent::Value { value, salt } => ContentHasher::LEAF.hash_parts(&[
                self.property.compact(),
                value,
                salt.as_bytes(),
            ]),
            LeafContent::Hashed { hash } => *hash,
        }
    }
}

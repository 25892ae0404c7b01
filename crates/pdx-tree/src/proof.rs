use serde::{Deserialize, Serialize};

use pdx_crypto::ContentHasher;

use crate::leaf::{LeafContent, LeafNode};
use crate::property::Property;

/// A field-addressed merkle proof.
///
/// `sorted_hashes` is the ordered sibling sequence from the leaf to the
/// root. Siblings carry no side information: every internal node hashes the
/// byte-sorted pair, so folding is order-free at each step. Cross-tree
/// proofs extend the sequence with the sibling roots of the enclosing
/// trees (coredoc root, signatures root, signing root) — verification is
/// the same fold all the way to the document root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// The proven leaf's address.
    pub property: Property,
    /// The leaf payload being proven: the revealed (value, salt), or the
    /// bare hash for pre-hashed leaves.
    pub content: LeafContent,
    /// Sibling hashes from the leaf to the root.
    pub sorted_hashes: Vec<[u8; 32]>,
}

impl Proof {
    pub(crate) fn new(leaf: &LeafNode, sorted_hashes: Vec<[u8; 32]>) -> Self {
        Self {
            property: leaf.property.clone(),
            content: leaf.content.clone(),
            sorted_hashes,
        }
    }

    /// The hash of the proven leaf.
    pub fn leaf_hash(&self) -> [u8; 32] {
        LeafNode {
            property: self.property.clone(),
            content: self.content.clone(),
        }
        .leaf_hash()
    }

    /// Verify the proof: fold the sibling hashes and accept iff the result
    /// equals `root`.
    pub fn verify(&self, root: &[u8; 32]) -> bool {
        let mut current = self.leaf_hash();
        for sibling in &self.sorted_hashes {
            current = ContentHasher::NODE.hash_sorted_pair(&current, sibling);
        }
        current == *root
    }

    /// Extend the proof with sibling roots of enclosing trees.
    pub fn append_hashes(&mut self, hashes: impl IntoIterator<Item = [u8; 32]>) {
        self.sorted_hashes.extend(hashes);
    }
}

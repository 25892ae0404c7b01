use pdx_crypto::ContentHasher;
use pdx_types::Salt;

use crate::error::{TreeError, TreeResult};
use crate::leaf::LeafNode;
use crate::proof::Proof;
use crate::property::Property;
use crate::traverse;

/// A salted merkle tree over an ordered leaf sequence.
///
/// Leaves are added (from a structured value, or explicitly), then the tree
/// is frozen with [`generate`](Self::generate). Only a generated tree can
/// produce a root or proofs; a generated tree rejects further mutation.
#[derive(Clone, Debug)]
pub struct DocumentTree {
    prefix: Option<Property>,
    leaves: Vec<LeafNode>,
    /// Level 0 = leaf hashes, last level = [root]. Empty until generated.
    levels: Vec<Vec<[u8; 32]>>,
}

impl DocumentTree {
    /// A tree without a parent prefix.
    pub fn new() -> Self {
        Self {
            prefix: None,
            leaves: Vec::new(),
            levels: Vec::new(),
        }
    }

    /// A tree whose traversed leaves are namespaced under `prefix`.
    pub fn with_prefix(prefix: Property) -> Self {
        Self {
            prefix: Some(prefix),
            leaves: Vec::new(),
            levels: Vec::new(),
        }
    }

    /// The parent prefix, if any.
    pub fn prefix(&self) -> Option<&Property> {
        self.prefix.as_ref()
    }

    fn generated(&self) -> bool {
        !self.levels.is_empty()
    }

    /// Add an explicit leaf. The property must carry its full path.
    pub fn add_leaf(&mut self, leaf: LeafNode) -> TreeResult<()> {
        if self.generated() {
            return Err(TreeError::TreeGenerated);
        }
        self.leaves.push(leaf);
        Ok(())
    }

    /// Add a pre-hashed leaf, typically the root of another tree.
    pub fn add_hashed_leaf(&mut self, property: Property, hash: [u8; 32]) -> TreeResult<()> {
        self.add_leaf(LeafNode::hashed(property, hash))
    }

    /// Traverse `value` and add one salted leaf per scalar, in traversal
    /// order. The salt sequence must match the leaf count exactly.
    pub fn add_value_leaves(
        &mut self,
        value: &serde_json::Value,
        salts: &[Salt],
    ) -> TreeResult<()> {
        if self.generated() {
            return Err(TreeError::TreeGenerated);
        }

        let base = self
            .prefix
            .clone()
            .unwrap_or_else(|| Property::new("", Vec::new()));
        let flat = traverse::flatten_value(&base, value);
        if flat.len() != salts.len() {
            return Err(TreeError::TreeMalformed(format!(
                "salt count mismatch: {} salts for {} leaves",
                salts.len(),
                flat.len()
            )));
        }

        for ((property, value), salt) in flat.into_iter().zip(salts.iter().copied()) {
            self.leaves.push(LeafNode::new(property, value, salt));
        }
        Ok(())
    }

    /// Number of leaves added so far.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Leaf properties in tree order.
    pub fn property_order(&self) -> Vec<&Property> {
        self.leaves.iter().map(|l| &l.property).collect()
    }

    /// The leaf at `readable_name`, if present.
    pub fn leaf(&self, readable_name: &str) -> Option<&LeafNode> {
        self.leaves
            .iter()
            .find(|l| l.property.readable() == readable_name)
    }

    /// Freeze the tree and compute all internal levels.
    pub fn generate(&mut self) -> TreeResult<()> {
        if self.generated() {
            return Err(TreeError::TreeGenerated);
        }
        if self.leaves.is_empty() {
            return Err(TreeError::TreeMalformed("tree has no leaves".into()));
        }

        let mut levels: Vec<Vec<[u8; 32]>> =
            vec![self.leaves.iter().map(LeafNode::leaf_hash).collect()];
        let mut current = levels[0].clone();

        while current.len() > 1 {
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for pair in current.chunks(2) {
                let hash = if pair.len() == 2 {
                    ContentHasher::NODE.hash_sorted_pair(&pair[0], &pair[1])
                } else {
                    // Odd node: hash with itself
                    ContentHasher::NODE.hash_sorted_pair(&pair[0], &pair[0])
                };
                next.push(hash);
            }
            levels.push(next.clone());
            current = next;
        }

        self.levels = levels;
        Ok(())
    }

    /// The root hash of the generated tree.
    pub fn root_hash(&self) -> TreeResult<[u8; 32]> {
        if !self.generated() {
            return Err(TreeError::TreeNotGenerated);
        }
        Ok(self.levels[self.levels.len() - 1][0])
    }

    /// Create a proof for the leaf at `readable_name`.
    pub fn create_proof(&self, readable_name: &str) -> TreeResult<Proof> {
        if !self.generated() {
            return Err(TreeError::TreeNotGenerated);
        }

        let index = self
            .leaves
            .iter()
            .position(|l| l.property.readable() == readable_name)
            .ok_or_else(|| TreeError::ProofFieldNotFound(readable_name.to_string()))?;

        let mut path = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            if level.len() == 1 {
                break;
            }
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            let sibling = if sibling_idx < level.len() {
                level[sibling_idx]
            } else {
                // Odd level: the node was paired with itself
                level[idx]
            };
            path.push(sibling);
            idx /= 2;
        }

        Ok(Proof::new(&self.leaves[index], path))
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn salted_tree(value: &serde_json::Value) -> DocumentTree {
        let mut tree = DocumentTree::with_prefix(Property::new("doc", vec![0, 1, 0, 0]));
        let salts = Salt::batch(traverse::count_leaves(value));
        tree.add_value_leaves(value, &salts).unwrap();
        tree.generate().unwrap();
        tree
    }

    #[test]
    fn identical_inputs_identical_roots() {
        let value = json!({"amount": 100, "currency": "EUR", "lines": ["a", "b", "c"]});
        let salts = Salt::batch(traverse::count_leaves(&value));

        let mut t1 = DocumentTree::with_prefix(Property::new("doc", vec![0, 1, 0, 0]));
        t1.add_value_leaves(&value, &salts).unwrap();
        t1.generate().unwrap();

        let mut t2 = DocumentTree::with_prefix(Property::new("doc", vec![0, 1, 0, 0]));
        t2.add_value_leaves(&value, &salts).unwrap();
        t2.generate().unwrap();

        assert_eq!(t1.root_hash().unwrap(), t2.root_hash().unwrap());
    }

    #[test]
    fn different_salts_different_roots() {
        let value = json!({"amount": 100});
        let mut t1 = DocumentTree::new();
        t1.add_value_leaves(&value, &[Salt::from_raw([1; 32])]).unwrap();
        t1.generate().unwrap();
        let mut t2 = DocumentTree::new();
        t2.add_value_leaves(&value, &[Salt::from_raw([2; 32])]).unwrap();
        t2.generate().unwrap();
        assert_ne!(t1.root_hash().unwrap(), t2.root_hash().unwrap());
    }

    #[test]
    fn proof_verifies_for_every_leaf() {
        let value = json!({
            "amount": 100,
            "currency": "EUR",
            "recipient": {"name": "ACME", "city": "Berlin"},
            "lines": [1, 2, 3, 4, 5],
        });
        let tree = salted_tree(&value);
        let root = tree.root_hash().unwrap();

        for prop in tree.property_order() {
            let proof = tree.create_proof(prop.readable()).unwrap();
            assert!(proof.verify(&root), "proof for {} should verify", prop);
        }
    }

    #[test]
    fn tampered_proof_fails() {
        let tree = salted_tree(&json!({"a": 1, "b": 2, "c": 3}));
        let root = tree.root_hash().unwrap();
        let mut proof = tree.create_proof("doc.a").unwrap();
        proof.content = crate::leaf::LeafContent::Value {
            value: b"999".to_vec(),
            salt: Salt::zero(),
        };
        assert!(!proof.verify(&root));
    }

    #[test]
    fn unknown_field_not_found() {
        let tree = salted_tree(&json!({"a": 1}));
        let err = tree.create_proof("doc.missing").unwrap_err();
        assert_eq!(err, TreeError::ProofFieldNotFound("doc.missing".into()));
    }

    #[test]
    fn proof_before_generate_fails() {
        let mut tree = DocumentTree::new();
        tree.add_value_leaves(&json!({"a": 1}), &[Salt::random()]).unwrap();
        assert_eq!(tree.create_proof("a").unwrap_err(), TreeError::TreeNotGenerated);
        assert_eq!(tree.root_hash().unwrap_err(), TreeError::TreeNotGenerated);
    }

    #[test]
    fn salt_count_mismatch_is_malformed() {
        let mut tree = DocumentTree::new();
        let err = tree
            .add_value_leaves(&json!({"a": 1, "b": 2}), &[Salt::random()])
            .unwrap_err();
        assert!(matches!(err, TreeError::TreeMalformed(_)));
    }

    #[test]
    fn mutation_after_generate_rejected() {
        let mut tree = salted_tree(&json!({"a": 1}));
        let err = tree.add_hashed_leaf(Property::new("x", vec![]), [0; 32]).unwrap_err();
        assert_eq!(err, TreeError::TreeGenerated);
        assert_eq!(tree.generate().unwrap_err(), TreeError::TreeGenerated);
    }

    #[test]
    fn empty_tree_rejected() {
        let mut tree = DocumentTree::new();
        assert!(matches!(tree.generate().unwrap_err(), TreeError::TreeMalformed(_)));
    }

    #[test]
    fn odd_leaf_counts_generate() {
        for n in 1..9usize {
            let items: Vec<serde_json::Value> =
                (0..n).map(|i| json!(i)).collect();
            let value = json!({ "items": items });
            let tree = salted_tree(&value);
            let root = tree.root_hash().unwrap();
            for prop in tree.property_order() {
                assert!(tree.create_proof(prop.readable()).unwrap().verify(&root));
            }
        }
    }

    #[test]
    fn prehashed_leaves_compose_across_trees() {
        // Child tree over data
        let child = salted_tree(&json!({"amount": 42, "currency": "EUR"}));
        let child_root = child.root_hash().unwrap();

        // Parent tree: two pre-hashed leaves, one of them the child root
        let sibling = [0x77u8; 32];
        let mut parent = DocumentTree::new();
        parent
            .add_hashed_leaf(
                Property::new("signing_tree.data_root", vec![2, 0, 0, 0, 0, 0, 0, 5]),
                child_root,
            )
            .unwrap();
        parent
            .add_hashed_leaf(
                Property::new("signing_tree.cd_root", vec![2, 0, 0, 0, 0, 0, 0, 7]),
                sibling,
            )
            .unwrap();
        parent.generate().unwrap();
        let parent_root = parent.root_hash().unwrap();

        // A child-field proof extended with the sibling reaches the parent root
        let mut proof = child.create_proof("doc.amount").unwrap();
        assert!(proof.verify(&child_root));
        proof.append_hashes([sibling]);
        assert!(proof.verify(&parent_root));
    }
}

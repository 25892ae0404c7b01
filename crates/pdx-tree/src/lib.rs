//! Salted, prefixed merkle trees with field-addressed proofs.
//!
//! A [`DocumentTree`] is built from an ordered sequence of named leaves,
//! each mixed with a per-leaf salt, then frozen with [`DocumentTree::generate`].
//! Internal nodes hash byte-sorted sibling pairs, so two independently built
//! trees over the same leaves produce the same canonical root.
//!
//! Leaves come from two sources: a deterministic traversal of a
//! [`serde_json::Value`] document ([`DocumentTree::add_value_leaves`]), and
//! explicit leaves — possibly pre-hashed roots of other trees
//! ([`DocumentTree::add_hashed_leaf`]). A tree constructed with a parent
//! prefix namespaces every traversed leaf under it, which is how disjoint
//! trees share one proof namespace.

pub mod error;
pub mod leaf;
pub mod proof;
pub mod property;
pub mod traverse;
pub mod tree;

pub use error::{TreeError, TreeResult};
pub use leaf::{LeafContent, LeafNode};
pub use proof::Proof;
pub use property::Property;
pub use tree::DocumentTree;

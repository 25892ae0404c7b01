use thiserror::Error;

/// Errors from merkle tree construction and proof generation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// The tree was queried before [`crate::DocumentTree::generate`].
    #[error("tree not generated")]
    TreeNotGenerated,

    /// The tree was mutated after [`crate::DocumentTree::generate`].
    #[error("tree already generated")]
    TreeGenerated,

    /// The leaf sequence and salt sequence disagree, or a leaf is invalid.
    #[error("malformed tree: {0}")]
    TreeMalformed(String),

    /// No leaf exists at the requested property path.
    #[error("no leaf found for property {0}")]
    ProofFieldNotFound(String),
}

pub type TreeResult<T> = Result<T, TreeError>;

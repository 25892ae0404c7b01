use thiserror::Error;

/// Errors from CoreDocument operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// `prepare_new_version` was called on a predecessor without a valid
    /// 32-byte document root. Fatal to the caller; do not retry.
    #[error("previous document root is missing or invalid")]
    InvalidPreviousRoot,

    /// A proof was requested for a field under a tree prefix the document
    /// does not know.
    #[error("unknown tree prefix: {0}")]
    UnknownTreePrefix(String),

    /// An NFT token identifier was not 32 bytes.
    #[error("invalid NFT token: expected 32 bytes, got {0}")]
    InvalidNftToken(usize),

    /// The data root has not been calculated yet.
    #[error("data root is missing")]
    MissingDataRoot,

    /// The signing root has not been calculated yet.
    #[error("signing root is missing")]
    MissingSigningRoot,

    /// The document root has not been calculated yet.
    #[error("document root is missing")]
    MissingDocumentRoot,

    #[error(transparent)]
    Tree(#[from] pdx_tree::TreeError),

    #[error(transparent)]
    Type(#[from] pdx_types::TypeError),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

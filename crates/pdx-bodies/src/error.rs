use thiserror::Error;

/// Errors from typed-body operations.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The storage tag byte does not name a known body type.
    #[error("unknown body type tag: {0:#04x}")]
    UnknownTypeTag(u8),

    /// The payload could not be decoded.
    #[error("body decode error: {0}")]
    Decode(String),

    /// The payload could not be encoded.
    #[error("body encode error: {0}")]
    Encode(String),

    /// The NFT is not bound to this document.
    #[error("NFT not found on document")]
    NftNotFound,

    #[error(transparent)]
    Document(#[from] pdx_document::DocumentError),

    #[error(transparent)]
    Tree(#[from] pdx_tree::TreeError),
}

pub type BodyResult<T> = Result<T, BodyError>;

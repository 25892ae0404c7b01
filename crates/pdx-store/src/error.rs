use pdx_types::{DocumentId, VersionId};
use thiserror::Error;

/// Errors from document storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the version.
    #[error("document version not found: {0}")]
    NotFound(VersionId),

    /// A record already exists for the version.
    #[error("document version already exists: {0}")]
    AlreadyExists(VersionId),

    /// The update was derived from a version that is no longer current.
    /// The caller must re-derive from the new current version.
    #[error("stale base for document {0}: current version moved")]
    StaleBase(DocumentId),

    /// The update does not reference a predecessor version.
    #[error("update for document {0} carries no previous version")]
    MissingPredecessor(DocumentId),

    /// The `next_version` chain does not terminate.
    #[error("corrupted lineage for document: {0}")]
    CorruptedLineage(String),

    /// The stored payload could not be decoded.
    #[error(transparent)]
    Body(#[from] pdx_bodies::BodyError),

    /// The backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

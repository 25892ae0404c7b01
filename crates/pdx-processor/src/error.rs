use pdx_types::{Did, DocumentId, VersionId};
use thiserror::Error;

/// Errors from the document pipelines.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Pre-commit was rejected or the completion signal failed. The
    /// version returns to its initial state.
    #[error("pre-anchor failed: {0}")]
    PreAnchorFailed(String),

    /// Commit was rejected after pre-commit. Fatal for this version; the
    /// caller must start a fresh one.
    #[error("anchor failed: {0}")]
    AnchorFailed(String),

    /// A validator in the active group rejected the document.
    #[error("validation failed in {validator}: {reason}")]
    Validation { validator: String, reason: String },

    /// The computed document root does not match the registry record.
    #[error("document root mismatch against anchor registry for {0}")]
    AnchorMismatch(VersionId),

    /// No anchor is recorded for the received version.
    #[error("no anchor recorded for version {0}")]
    AnchorMissing(VersionId),

    /// The anchor predates the sender's claimed document timestamp.
    #[error("anchor for {0} predates the document timestamp")]
    AnchorNotMonotonic(VersionId),

    /// A non-genesis version arrived whose predecessor is not stored.
    #[error("unknown predecessor {0}")]
    UnknownPredecessor(VersionId),

    /// The requested document or version is absent from local storage.
    #[error("document version not found: {0}")]
    NotFound(VersionId),

    /// Another transition won the race for this document.
    #[error("stale base for document {0}")]
    StaleBase(DocumentId),

    /// The sender is not allowed to perform the operation.
    #[error("sender {0} is not a collaborator on the document")]
    SenderNotCollaborator(Did),

    /// Too few signatures were collected to anchor.
    #[error("insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures { have: usize, need: usize },

    /// The peer transport failed fatally.
    #[error("peer error: {0}")]
    Peer(String),

    /// A bounded wait elapsed.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error(transparent)]
    Body(#[from] pdx_bodies::BodyError),

    #[error(transparent)]
    Document(#[from] pdx_document::DocumentError),

    #[error(transparent)]
    Access(#[from] pdx_access::AccessError),

    #[error(transparent)]
    Identity(#[from] pdx_identity::IdentityError),

    #[error(transparent)]
    Anchor(#[from] pdx_anchors::AnchorError),

    #[error(transparent)]
    Protocol(#[from] pdx_protocol::ProtocolError),
}

impl From<pdx_store::StoreError> for ProcessorError {
    fn from(err: pdx_store::StoreError) -> Self {
        match err {
            pdx_store::StoreError::StaleBase(id) => Self::StaleBase(id),
            pdx_store::StoreError::NotFound(version) => Self::NotFound(version),
            other => Self::Validation {
                validator: "storage".into(),
                reason: other.to_string(),
            },
        }
    }
}

pub type ProcessorResult<T> = Result<T, ProcessorError>;

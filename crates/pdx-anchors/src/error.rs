use pdx_types::VersionId;
use thiserror::Error;

/// Errors from anchor registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnchorError {
    /// The anchor slot is already committed.
    #[error("anchor {0} already committed")]
    AlreadyCommitted(VersionId),

    /// The anchor slot is pre-committed under a different signing root.
    #[error("anchor {0} reserved by a different signing root")]
    Reserved(VersionId),

    /// The signing-root proof hashes do not fold to the document root.
    #[error("signing root proof does not match document root for anchor {0}")]
    ProofMismatch(VersionId),

    /// No anchor is recorded for the version.
    #[error("anchor not found: {0}")]
    NotFound(VersionId),

    /// The registry could not be reached; retried by the client and
    /// surfaced only when exhausted.
    #[error("registry unavailable: {0}")]
    Transient(String),

    /// The completion signal's sender was dropped without resolving.
    #[error("completion signal dropped")]
    SignalDropped,
}

pub type AnchorResult<T> = Result<T, AnchorError>;

use pdx_types::Did;
use thiserror::Error;

/// Errors from access evaluation.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The requester is not reachable via any read rule.
    #[error("account {0} cannot read the document")]
    ReadDenied(Did),

    /// The NFT is not bound to the document with read access.
    #[error("NFT is not bound to the document")]
    NftNotBound,

    /// The on-chain owner of the NFT is not the requester.
    #[error("NFT owner mismatch: owner {owner}, requester {requester}")]
    NotNftOwner { owner: Did, requester: Did },

    /// The delegating document does not carry the referenced token.
    #[error("access token not found on delegating document")]
    AccessTokenNotFound,

    /// The token does not grant access to the requested document.
    #[error("access token does not reference the requested document")]
    TokenScopeMismatch,

    /// The token signature did not verify against the granter's key.
    #[error("access token signature invalid")]
    InvalidAccessToken,

    /// The delegating document is absent from local storage.
    #[error("delegating document not found")]
    DelegatingDocumentNotFound,

    /// A changed leaf has no covering transition rule for the actor.
    #[error("transition not permitted for {property}")]
    UnpermittedTransition { property: String },

    /// The token registry lookup failed.
    #[error("token registry error: {0}")]
    Registry(String),

    #[error(transparent)]
    Identity(#[from] pdx_identity::IdentityError),

    #[error(transparent)]
    Body(#[from] pdx_bodies::BodyError),
}

pub type AccessResult<T> = Result<T, AccessError>;

use pdx_types::Did;
use thiserror::Error;

/// Errors from identity operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// No key is registered for the identity.
    #[error("unknown identity: {0}")]
    UnknownIdentity(Did),

    /// A signature failed verification against the resolved key.
    #[error("invalid signature for identity {0}")]
    InvalidSignature(Did),

    /// The factory contract rejected or failed the call.
    #[error("identity contract error: {0}")]
    Contract(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

//! Access control for PDX documents.
//!
//! Two questions are answered here:
//!
//! - **May the requester read this document?** — by collaborator
//!   membership, NFT ownership, or access-token delegation
//!   ([`ReadAccessEvaluator`]).
//! - **May the actor derive this new version?** — by diffing the old and
//!   new leaves against the previous version's transition rules
//!   ([`TransitionValidator`]).

pub mod error;
pub mod read;
pub mod transition;

pub use error::{AccessError, AccessResult};
pub use read::{AccessMode, DelegatingDocs, ReadAccessEvaluator, TokenRegistry};
pub use transition::TransitionValidator;

//! The CoreDocument envelope.
//!
//! A [`CoreDocument`] wraps any typed document body with version lineage,
//! collaborator-scoped read and transition rules, NFT bindings, access
//! tokens, and signatures, and derives the four roots that commit a version:
//!
//! - the **data root** over the typed body (computed by `pdx-bodies`),
//! - the **coredoc root** over the envelope fields,
//! - the **signing root** over `(data_root, cd_root)` — what signers sign,
//! - the **document root** over `(signing_root, signatures_root)` — what is
//!   anchored on the ledger.
//!
//! Each subtree carries its own prefix (`cd_tree`, `signing_tree`,
//! `signatures_tree`, `dr_tree`), and [`CoreDocument::create_proofs`]
//! composes cross-tree proofs that verify any field against the document
//! root alone.

pub mod access_token;
pub mod document;
pub mod error;
pub mod fields;
pub mod rules;
pub mod signature;

pub use access_token::AccessToken;
pub use document::CoreDocument;
pub use error::{DocumentError, DocumentResult};
pub use rules::{FieldMatchType, Nft, ReadAction, ReadRule, Role, TransitionAction, TransitionRule};
pub use signature::{DocumentSignature, SignatureData};

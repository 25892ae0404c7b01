//! Hashing and signing primitives for PDX.
//!
//! - [`ContentHasher`] — domain-separated BLAKE3 hashing
//! - [`HashPair`] — `(preimage, version)` generation for lineage identifiers
//! - [`SigningKey`] / [`VerifyingKey`] — ed25519 wrappers

pub mod hasher;
pub mod pair;
pub mod signer;

pub use hasher::ContentHasher;
pub use pair::HashPair;
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};

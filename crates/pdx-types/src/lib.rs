//! Foundation types for PDX (Peer Document Exchange).
//!
//! This crate provides the identity and lineage primitives used throughout
//! the PDX system. Every other PDX crate depends on `pdx-types`.
//!
//! # Key Types
//!
//! - [`VersionId`] — 32-byte version identifier in a document lineage
//! - [`Preimage`] — the hidden value whose hash is the next [`VersionId`]
//! - [`Did`] — 20-byte participant address
//! - [`Salt`] — per-leaf random value mixed into merkle leaves
//! - [`RoleKey`] — 32-byte random key naming an access-control role

pub mod did;
pub mod error;
pub mod ids;
pub mod salt;

pub use did::Did;
pub use error::TypeError;
pub use ids::{DocumentId, Preimage, VersionId};
pub use salt::{RoleKey, Salt};

//! Anchoring: committing document roots to the shared ledger.
//!
//! [`AnchorRegistry`] is the client seam: `pre_commit` reserves a version
//! slot with the signing root, `commit` reveals the preimage and records
//! the document root. Both return a [`CompletionSignal`] abstracting the
//! asynchronous receipt — one awaited outcome with an inspectable error.

pub mod error;
pub mod memory;
pub mod registry;

pub use error::{AnchorError, AnchorResult};
pub use memory::InMemoryAnchorRegistry;
pub use registry::{AnchorRecord, AnchorRegistry, CompletionHandle, CompletionSignal};

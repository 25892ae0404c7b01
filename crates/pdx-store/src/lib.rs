//! Durable document storage.
//!
//! [`DocumentRepository`] is the raw keyspace: `account ‖ version` to
//! tagged body bytes, one immutable record per anchored version.
//! [`DocumentService`] is the facade the rest of the system talks to —
//! head tracking with compare-and-swap, version walks with cycle
//! detection, and body derivation from wire bytes.

pub mod error;
pub mod repository;
pub mod service;

pub use error::{StoreError, StoreResult};
pub use repository::{DocumentRepository, InMemoryRepository};
pub use service::DocumentService;

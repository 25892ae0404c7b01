//! The PDX document pipelines.
//!
//! The outgoing pipeline ([`AnchorProcessor`]) drives an author's document
//! from creation through signature collection, anchoring, and delivery.
//! The incoming pipeline ([`ReceivePipeline`]) receives, validates, and
//! persists anchored documents from peers, and answers signature and
//! document requests. [`MessageHandler`] routes wire envelopes onto the
//! incoming pipeline.
//!
//! Per-document serialisation: within a process, at most one version
//! transition is in flight per document ([`DocumentLocks`]); across
//! writers, the storage head compare-and-swap makes the loser fail with a
//! stale base.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod incoming;
pub mod outgoing;
pub mod validators;

pub use client::PeerClient;
pub use config::NodeConfig;
pub use error::{ProcessorError, ProcessorResult};
pub use handler::MessageHandler;
pub use incoming::{IncomingState, ReceivePipeline};
pub use outgoing::{AnchorProcessor, DeliveryReport, DocumentLocks, OutgoingState};
pub use validators::{
    post_anchored_validator, pre_anchor_validator, received_document_validator,
    signature_validator, DocumentValidator, ValidatorGroup,
};

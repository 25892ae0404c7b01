use async_trait::async_trait;

use pdx_bodies::Body;
use pdx_document::DocumentSignature;
use pdx_types::Did;

use crate::error::ProcessorResult;

/// The peer transport, as consumed by the outgoing pipeline.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Solicit signatures over the document's signing root from `signers`.
    ///
    /// Returns the collected signatures and the per-peer errors that were
    /// tolerated. A fatal transport failure is the `Err` case.
    async fn get_signatures(
        &self,
        document: &Body,
        signers: &[Did],
    ) -> ProcessorResult<(Vec<DocumentSignature>, Vec<(Did, String)>)>;

    /// Deliver an anchored document to a collaborator. Returns whether the
    /// receiver accepted it.
    async fn send_anchored(&self, receiver: &Did, document: &Body) -> ProcessorResult<bool>;
}

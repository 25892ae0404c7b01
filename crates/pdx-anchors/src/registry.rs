use async_trait::async_trait;
use tokio::sync::oneshot;

use pdx_types::{Preimage, VersionId};

use crate::error::{AnchorError, AnchorResult};

/// A ledger record binding `(anchor_id, document_root, timestamp)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorRecord {
    pub anchor_id: VersionId,
    pub document_root: [u8; 32],
    /// Unix seconds at which the anchor was recorded.
    pub anchored_at: u64,
}

/// Single-shot completion of an asynchronous registry submission.
///
/// The caller awaits one boolean-shaped outcome; on failure the error is
/// the inspectable reason. Dropping the signal cancels nothing on the
/// registry side — submissions are idempotent there.
pub struct CompletionSignal {
    rx: oneshot::Receiver<AnchorResult<()>>,
}

/// The resolving side of a [`CompletionSignal`].
pub struct CompletionHandle {
    tx: oneshot::Sender<AnchorResult<()>>,
}

impl CompletionSignal {
    /// A pending signal and its resolving handle.
    pub fn pending() -> (CompletionHandle, CompletionSignal) {
        let (tx, rx) = oneshot::channel();
        (CompletionHandle { tx }, CompletionSignal { rx })
    }

    /// An already-resolved signal.
    pub fn ready(result: AnchorResult<()>) -> Self {
        let (handle, signal) = Self::pending();
        handle.complete(result);
        signal
    }

    /// Await the outcome.
    pub async fn done(self) -> AnchorResult<()> {
        self.rx.await.unwrap_or(Err(AnchorError::SignalDropped))
    }
}

impl CompletionHandle {
    /// Resolve the signal. A dropped receiver is fine.
    pub fn complete(self, result: AnchorResult<()>) {
        let _ = self.tx.send(result);
    }
}

/// The anchor registry, as seen by the document core.
///
/// `pre_commit` reserves the version slot against races, carrying only the
/// signing root. `commit` reveals the preimage (the registry derives and
/// checks the anchor id from it) and records the document root together
/// with the proof hashes that tie the signing root into it.
#[async_trait]
pub trait AnchorRegistry: Send + Sync {
    async fn pre_commit(
        &self,
        anchor_id: VersionId,
        signing_root: [u8; 32],
    ) -> AnchorResult<CompletionSignal>;

    async fn commit(
        &self,
        anchor_id_preimage: Preimage,
        document_root: [u8; 32],
        signing_root_proof_hashes: Vec<[u8; 32]>,
    ) -> AnchorResult<CompletionSignal>;

    async fn get_anchor(&self, anchor_id: &VersionId) -> AnchorResult<Option<AnchorRecord>>;
}

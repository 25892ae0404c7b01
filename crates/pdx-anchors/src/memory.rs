use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::info;

use pdx_crypto::ContentHasher;
use pdx_types::{Preimage, VersionId};

use crate::error::{AnchorError, AnchorResult};
use crate::registry::{AnchorRecord, AnchorRegistry, CompletionSignal};

const DEFAULT_PRECOMMIT_TTL: Duration = Duration::from_secs(300);

/// In-memory anchor registry for tests, local demos, and embedding.
///
/// Completion signals resolve immediately; a real client resolves them
/// after receipt polling. Semantics match the contract: pre-commits
/// reserve a slot for a signing root until they expire, commits verify the
/// preimage and the signing-root proof, and anchoring is idempotent per
/// `(anchor_id, document_root)`.
pub struct InMemoryAnchorRegistry {
    precommit_ttl: Duration,
    inner: RwLock<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    /// anchor_id -> (signing_root, expires_at unix seconds)
    precommits: HashMap<VersionId, ([u8; 32], u64)>,
    anchors: HashMap<VersionId, AnchorRecord>,
}

impl InMemoryAnchorRegistry {
    pub fn new() -> Self {
        Self::with_precommit_ttl(DEFAULT_PRECOMMIT_TTL)
    }

    pub fn with_precommit_ttl(precommit_ttl: Duration) -> Self {
        Self {
            precommit_ttl,
            inner: RwLock::new(RegistryState::default()),
        }
    }

    /// Number of recorded anchors.
    pub fn anchor_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").anchors.len()
    }
}

impl Default for InMemoryAnchorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnchorRegistry for InMemoryAnchorRegistry {
    async fn pre_commit(
        &self,
        anchor_id: VersionId,
        signing_root: [u8; 32],
    ) -> AnchorResult<CompletionSignal> {
        let mut state = self.inner.write().expect("lock poisoned");

        if state.anchors.contains_key(&anchor_id) {
            return Ok(CompletionSignal::ready(Err(AnchorError::AlreadyCommitted(
                anchor_id,
            ))));
        }

        let now = unix_now();
        if let Some((reserved_root, expires_at)) = state.precommits.get(&anchor_id) {
            if *expires_at > now && *reserved_root != signing_root {
                return Ok(CompletionSignal::ready(Err(AnchorError::Reserved(
                    anchor_id,
                ))));
            }
        }

        let expires_at = now + self.precommit_ttl.as_secs();
        state.precommits.insert(anchor_id, (signing_root, expires_at));
        info!(anchor = %anchor_id, "pre-committed anchor");
        Ok(CompletionSignal::ready(Ok(())))
    }

    async fn commit(
        &self,
        anchor_id_preimage: Preimage,
        document_root: [u8; 32],
        signing_root_proof_hashes: Vec<[u8; 32]>,
    ) -> AnchorResult<CompletionSignal> {
        let anchor_id = anchor_id_preimage.version();
        let mut state = self.inner.write().expect("lock poisoned");

        if let Some(existing) = state.anchors.get(&anchor_id) {
            let result = if existing.document_root == document_root {
                Ok(())
            } else {
                Err(AnchorError::AlreadyCommitted(anchor_id))
            };
            return Ok(CompletionSignal::ready(result));
        }

        // A live pre-commit binds the slot to a signing root; the proof
        // hashes must fold that root into the committed document root.
        let now = unix_now();
        if let Some((reserved_root, expires_at)) = state.precommits.get(&anchor_id) {
            if *expires_at > now {
                let mut folded = *reserved_root;
                for hash in &signing_root_proof_hashes {
                    folded = ContentHasher::NODE.hash_sorted_pair(&folded, hash);
                }
                if folded != document_root {
                    return Ok(CompletionSignal::ready(Err(AnchorError::ProofMismatch(
                        anchor_id,
                    ))));
                }
            }
        }

        state.precommits.remove(&anchor_id);
        state.anchors.insert(
            anchor_id,
            AnchorRecord {
                anchor_id,
                document_root,
                anchored_at: now,
            },
        );
        info!(anchor = %anchor_id, "committed anchor");
        Ok(CompletionSignal::ready(Ok(())))
    }

    async fn get_anchor(&self, anchor_id: &VersionId) -> AnchorResult<Option<AnchorRecord>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.anchors.get(anchor_id).cloned())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Preimage, VersionId) {
        let preimage = Preimage::random();
        (preimage, preimage.version())
    }

    #[tokio::test]
    async fn commit_without_precommit_succeeds() {
        let registry = InMemoryAnchorRegistry::new();
        let (preimage, anchor_id) = pair();

        let signal = registry.commit(preimage, [1u8; 32], vec![]).await.unwrap();
        assert!(signal.done().await.is_ok());

        let record = registry.get_anchor(&anchor_id).await.unwrap().unwrap();
        assert_eq!(record.document_root, [1u8; 32]);
        assert!(record.anchored_at > 0);
    }

    #[tokio::test]
    async fn precommit_then_matching_commit() {
        let registry = InMemoryAnchorRegistry::new();
        let (preimage, anchor_id) = pair();
        let signing_root = [7u8; 32];
        let signatures_root = [8u8; 32];
        let document_root = ContentHasher::NODE.hash_sorted_pair(&signing_root, &signatures_root);

        let signal = registry.pre_commit(anchor_id, signing_root).await.unwrap();
        assert!(signal.done().await.is_ok());

        let signal = registry
            .commit(preimage, document_root, vec![signatures_root])
            .await
            .unwrap();
        assert!(signal.done().await.is_ok());
    }

    #[tokio::test]
    async fn precommit_guards_against_mismatched_commit() {
        let registry = InMemoryAnchorRegistry::new();
        let (preimage, anchor_id) = pair();

        registry
            .pre_commit(anchor_id, [7u8; 32])
            .await
            .unwrap()
            .done()
            .await
            .unwrap();

        let signal = registry
            .commit(preimage, [9u8; 32], vec![[1u8; 32]])
            .await
            .unwrap();
        assert_eq!(
            signal.done().await.unwrap_err(),
            AnchorError::ProofMismatch(anchor_id)
        );
    }

    #[tokio::test]
    async fn precommit_is_idempotent_per_signing_root() {
        let registry = InMemoryAnchorRegistry::new();
        let (_, anchor_id) = pair();

        for _ in 0..2 {
            let signal = registry.pre_commit(anchor_id, [5u8; 32]).await.unwrap();
            assert!(signal.done().await.is_ok());
        }

        let signal = registry.pre_commit(anchor_id, [6u8; 32]).await.unwrap();
        assert_eq!(
            signal.done().await.unwrap_err(),
            AnchorError::Reserved(anchor_id)
        );
    }

    #[tokio::test]
    async fn expired_precommit_frees_the_slot() {
        let registry = InMemoryAnchorRegistry::with_precommit_ttl(Duration::from_secs(0));
        let (_, anchor_id) = pair();

        registry
            .pre_commit(anchor_id, [5u8; 32])
            .await
            .unwrap()
            .done()
            .await
            .unwrap();

        let signal = registry.pre_commit(anchor_id, [6u8; 32]).await.unwrap();
        assert!(signal.done().await.is_ok());
    }

    #[tokio::test]
    async fn commit_is_idempotent_per_root() {
        let registry = InMemoryAnchorRegistry::new();
        let (preimage, anchor_id) = pair();

        registry
            .commit(preimage, [1u8; 32], vec![])
            .await
            .unwrap()
            .done()
            .await
            .unwrap();

        // same root: idempotent
        let signal = registry.commit(preimage, [1u8; 32], vec![]).await.unwrap();
        assert!(signal.done().await.is_ok());

        // different root: rejected
        let signal = registry.commit(preimage, [2u8; 32], vec![]).await.unwrap();
        assert_eq!(
            signal.done().await.unwrap_err(),
            AnchorError::AlreadyCommitted(anchor_id)
        );
        assert_eq!(registry.anchor_count(), 1);
    }

    #[tokio::test]
    async fn precommit_after_commit_rejected() {
        let registry = InMemoryAnchorRegistry::new();
        let (preimage, anchor_id) = pair();

        registry
            .commit(preimage, [1u8; 32], vec![])
            .await
            .unwrap()
            .done()
            .await
            .unwrap();

        let signal = registry.pre_commit(anchor_id, [5u8; 32]).await.unwrap();
        assert_eq!(
            signal.done().await.unwrap_err(),
            AnchorError::AlreadyCommitted(anchor_id)
        );
    }

    #[tokio::test]
    async fn missing_anchor_is_none() {
        let registry = InMemoryAnchorRegistry::new();
        let (_, anchor_id) = pair();
        assert!(registry.get_anchor(&anchor_id).await.unwrap().is_none());
    }
}

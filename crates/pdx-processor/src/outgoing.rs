use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::timeout;
use tracing::{info, warn};

use pdx_anchors::{AnchorRegistry, CompletionSignal};
use pdx_bodies::Body;
use pdx_crypto::SigningKey;
use pdx_document::DocumentSignature;
use pdx_identity::IdentityService;
use pdx_types::{Did, DocumentId};

use crate::client::PeerClient;
use crate::config::NodeConfig;
use crate::error::{ProcessorError, ProcessorResult};
use crate::validators;

/// States of the outgoing (author) pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutgoingState {
    Initialised,
    SignaturesPrepared,
    AnchoringRequested,
    PreCommitted,
    SignaturesCollected,
    Anchored,
    Delivered,
}

/// Outcome of delivering an anchored document to its collaborators.
/// Partial failures do not roll back the anchor.
#[derive(Clone, Debug, Default)]
pub struct DeliveryReport {
    pub delivered: Vec<Did>,
    pub failures: Vec<(Did, String)>,
}

/// Per-document serialisation: at most one in-flight version transition
/// per `document_id` within this process.
#[derive(Default)]
pub struct DocumentLocks {
    inner: Mutex<HashMap<DocumentId, Arc<tokio::sync::Mutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock handle for a document. Hold its guard across the whole
    /// transition.
    pub fn handle(&self, document_id: DocumentId) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().expect("lock poisoned");
        map.entry(document_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Drives a document version from creation through signature collection,
/// anchoring, and delivery.
pub struct AnchorProcessor {
    client: Arc<dyn PeerClient>,
    registry: Arc<dyn AnchorRegistry>,
    identities: Arc<dyn IdentityService>,
    key: SigningKey,
    config: NodeConfig,
    locks: DocumentLocks,
}

impl AnchorProcessor {
    pub fn new(
        client: Arc<dyn PeerClient>,
        registry: Arc<dyn AnchorRegistry>,
        identities: Arc<dyn IdentityService>,
        key: SigningKey,
        config: NodeConfig,
    ) -> Self {
        Self {
            client,
            registry,
            identities,
            key,
            config,
            locks: DocumentLocks::new(),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// S0 -> S1: compute the data root, record the update log, compute the
    /// signing root, and append the author's own signature.
    pub fn prepare_for_signature_requests(&self, body: &mut Body) -> ProcessorResult<()> {
        body.calculate_data_root()?;
        body.core_mut().add_update_log(self.config.identity);
        let signing_root = body.calculate_signing_root()?;

        let signature = self.key.sign(&signing_root);
        body.core_mut().append_signatures([DocumentSignature {
            signer_id: self.config.identity,
            public_key: self.key.verifying_key().as_bytes(),
            signature: signature.to_bytes().to_vec(),
            timestamp: unix_now(),
        }]);

        Ok(())
    }

    /// S1 -> S3 (optional): reserve the version slot with the signing
    /// root. Failure aborts back to the initial state.
    pub async fn pre_anchor(&self, body: &mut Body) -> ProcessorResult<()> {
        let signing_root = match body.core().signing_root() {
            Some(root) => root,
            None => body.calculate_signing_root()?,
        };
        let anchor_id = body.core().current_version;

        info!(document = %body.core().document_id, anchor = %anchor_id, "pre-anchoring");
        let signal = self
            .registry
            .pre_commit(anchor_id, signing_root)
            .await
            .map_err(|e| ProcessorError::PreAnchorFailed(e.to_string()))?;

        self.await_signal("pre-commit receipt", signal, self.config.default_task_timeout)
            .await
            .map_err(|e| ProcessorError::PreAnchorFailed(e.to_string()))
    }

    /// S1/S3 -> S4: validate the pre-signature conditions, solicit
    /// signatures from every signer-collaborator, and append what came
    /// back. Per-peer collection errors are tolerated; the quorum check
    /// decides whether enough arrived.
    pub async fn request_signatures(&self, body: &mut Body) -> ProcessorResult<()> {
        validators::signature_validator(self.identities.clone())
            .validate(None, body)
            .await?;

        let signers = body.core().signer_collaborators(&[self.config.identity]);
        if signers.is_empty() {
            return Ok(());
        }

        let (signatures, peer_errors) = timeout(
            self.config.p2p_connection_timeout,
            self.client.get_signatures(body, &signers),
        )
        .await
        .map_err(|_| ProcessorError::Timeout("signature collection".into()))??;

        for (peer, error) in &peer_errors {
            warn!(%peer, error, "signature collection error (tolerated)");
        }

        body.core_mut().append_signatures(signatures);
        self.check_quorum(body, &signers)
    }

    fn check_quorum(&self, body: &Body, signers: &[Did]) -> ProcessorResult<()> {
        let signed = body.core().signature_data.signers();
        match self.config.min_signatures {
            Some(need) => {
                if signed.len() < need {
                    return Err(ProcessorError::InsufficientSignatures {
                        have: signed.len(),
                        need,
                    });
                }
            }
            // default: one signature from each signer-collaborator
            None => {
                if !signers.iter().all(|s| signed.contains(s)) {
                    return Err(ProcessorError::InsufficientSignatures {
                        have: signed.len(),
                        need: signers.len() + 1,
                    });
                }
            }
        }
        Ok(())
    }

    /// S4 -> S5: re-validate, compute the document root, and commit it
    /// with the signing-root proof hashes. A registry rejection here is
    /// fatal for this version.
    ///
    /// Cancellation between pre-commit and commit is the dangerous window;
    /// the commit proceeds regardless to preserve lineage integrity, and
    /// pre-commits are idempotent at the registry.
    pub async fn anchor_document(&self, body: &mut Body) -> ProcessorResult<()> {
        validators::pre_anchor_validator(self.identities.clone())
            .validate(None, body)
            .await?;

        let document_root = body.calculate_document_root()?;
        let proof_hashes = body.core_mut().signing_root_proof_hashes()?;
        let preimage = body.core().current_preimage;

        info!(
            document = %body.core().document_id,
            version = %body.core().current_version,
            "anchoring document root"
        );
        let signal = self
            .registry
            .commit(preimage, document_root, proof_hashes)
            .await
            .map_err(|e| ProcessorError::AnchorFailed(e.to_string()))?;

        self.await_signal("commit receipt", signal, self.config.default_task_timeout)
            .await
            .map_err(|e| ProcessorError::AnchorFailed(e.to_string()))?;

        info!(version = %body.core().current_version, "anchored");
        Ok(())
    }

    /// S5 -> S6: post-anchor validation, then delivery to every
    /// signer-collaborator other than self.
    pub async fn send_document(&self, body: &mut Body) -> ProcessorResult<DeliveryReport> {
        validators::post_anchored_validator(self.identities.clone(), self.registry.clone())
            .validate(None, body)
            .await?;

        let recipients = body.core().signer_collaborators(&[self.config.identity]);
        let mut report = DeliveryReport::default();

        for recipient in recipients {
            let outcome = timeout(
                self.config.p2p_connection_timeout,
                self.client.send_anchored(&recipient, body),
            )
            .await;

            match outcome {
                Ok(Ok(true)) => {
                    info!(%recipient, "document delivered");
                    report.delivered.push(recipient);
                }
                Ok(Ok(false)) => {
                    warn!(%recipient, "receiver rejected the document");
                    report.failures.push((recipient, "rejected".into()));
                }
                Ok(Err(e)) => {
                    warn!(%recipient, error = %e, "delivery failed");
                    report.failures.push((recipient, e.to_string()));
                }
                Err(_) => {
                    warn!(%recipient, "delivery timed out");
                    report.failures.push((recipient, "timeout".into()));
                }
            }
        }

        Ok(report)
    }

    /// Run the full outgoing pipeline under the document's lock.
    pub async fn execute(
        &self,
        mut body: Body,
        pre_anchor: bool,
    ) -> ProcessorResult<(Body, OutgoingState, DeliveryReport)> {
        let lock = self.locks.handle(body.core().document_id);
        let _guard = lock.lock().await;

        let mut state = OutgoingState::Initialised;
        let mut advance = |next: OutgoingState| {
            tracing::debug!(from = ?state, to = ?next, "pipeline transition");
            state = next;
        };

        self.prepare_for_signature_requests(&mut body)?;
        advance(OutgoingState::SignaturesPrepared);

        if pre_anchor {
            advance(OutgoingState::AnchoringRequested);
            self.pre_anchor(&mut body).await?;
            advance(OutgoingState::PreCommitted);
        }

        self.request_signatures(&mut body).await?;
        advance(OutgoingState::SignaturesCollected);

        self.anchor_document(&mut body).await?;
        advance(OutgoingState::Anchored);

        let report = self.send_document(&mut body).await?;
        advance(OutgoingState::Delivered);

        Ok((body, state, report))
    }

    async fn await_signal(
        &self,
        what: &str,
        signal: CompletionSignal,
        bound: Duration,
    ) -> ProcessorResult<()> {
        match timeout(bound, signal.done()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProcessorError::Timeout(what.into())),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

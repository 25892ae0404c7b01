use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{debug, info};

use pdx_access::{AccessMode, DelegatingDocs, ReadAccessEvaluator, TokenRegistry};
use pdx_anchors::AnchorRegistry;
use pdx_bodies::Body;
use pdx_crypto::SigningKey;
use pdx_document::DocumentSignature;
use pdx_identity::IdentityService;
use pdx_protocol::{AccessRequest, GetDocumentRequest};
use pdx_store::{DocumentRepository, DocumentService, StoreError};
use pdx_types::{Did, DocumentId};

use crate::config::NodeConfig;
use crate::error::{ProcessorError, ProcessorResult};
use crate::validators;

/// States of the incoming (receiver) pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncomingState {
    Received,
    Parsed,
    AnchorResolved,
    Validated,
    Persisted,
}

/// Receives, validates, and persists documents from peers.
pub struct ReceivePipeline<R> {
    service: Arc<DocumentService<R>>,
    registry: Arc<dyn AnchorRegistry>,
    identities: Arc<dyn IdentityService>,
    key: SigningKey,
    config: NodeConfig,
}

impl<R: DocumentRepository> ReceivePipeline<R> {
    pub fn new(
        service: Arc<DocumentService<R>>,
        registry: Arc<dyn AnchorRegistry>,
        identities: Arc<dyn IdentityService>,
        key: SigningKey,
        config: NodeConfig,
    ) -> Self {
        Self {
            service,
            registry,
            identities,
            key,
            config,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn account(&self) -> Did {
        self.config.identity
    }

    /// Handle an anchored document from a peer: parse, resolve the anchor,
    /// run the full validator set with `sender` as the acting
    /// collaborator, and persist. Nothing is written unless validation
    /// passes.
    pub async fn receive_anchored(&self, bytes: &[u8], sender: Did) -> ProcessorResult<Body> {
        let mut state = IncomingState::Received;
        debug!(?state, %sender, "receiving anchored document");

        let body = Body::from_bytes(bytes)?;
        state = IncomingState::Parsed;
        debug!(?state, document = %body.core().document_id, "parsed incoming document");

        // The anchor is resolved (and its root compared) inside the
        // validator group; resolve the predecessor first so transition
        // legality can run against it.
        let predecessor = match body.core().previous_version {
            Some(previous) => Some(
                self.service
                    .get_version(&self.account(), &previous)
                    .map_err(|e| match e {
                        StoreError::NotFound(v) => ProcessorError::UnknownPredecessor(v),
                        other => other.into(),
                    })?,
            ),
            None => None,
        };
        state = IncomingState::AnchorResolved;
        debug!(?state, "anchor and predecessor resolved");

        validators::received_document_validator(
            self.identities.clone(),
            self.registry.clone(),
            sender,
        )
        .validate(predecessor.as_ref(), &body)
        .await?;
        state = IncomingState::Validated;
        debug!(?state, "incoming document validated");

        match predecessor {
            None => self.service.create(&self.account(), &body)?,
            Some(_) => self.service.update(&self.account(), &body)?,
        }
        state = IncomingState::Persisted;
        info!(
            ?state,
            document = %body.core().document_id,
            version = %body.core().current_version,
            %sender,
            "anchored document persisted"
        );

        Ok(body)
    }

    /// Handle a signature request: verify the sender may ask, validate
    /// the document's existing signatures, sign the signing root with the
    /// node key, and store the in-flight document.
    pub async fn sign_received_document(
        &self,
        bytes: &[u8],
        sender: Did,
    ) -> ProcessorResult<DocumentSignature> {
        let mut body = Body::from_bytes(bytes)?;

        if !body.core().account_can_read(&sender) {
            return Err(ProcessorError::SenderNotCollaborator(sender));
        }

        validators::signature_validator(self.identities.clone())
            .validate(None, &body)
            .await?;

        body.calculate_data_root()?;
        let signing_root = body.calculate_signing_root()?;

        let signature = DocumentSignature {
            signer_id: self.config.identity,
            public_key: self.key.verifying_key().as_bytes(),
            signature: self.key.sign(&signing_root).to_bytes().to_vec(),
            timestamp: unix_now(),
        };
        body.core_mut().append_signatures([signature.clone()]);

        self.service.store_revision(&self.account(), &body)?;
        info!(
            document = %body.core().document_id,
            %sender,
            "signed document over signing root"
        );

        Ok(signature)
    }

    /// Handle a document request: evaluate the claimed read access and
    /// return the current version.
    pub async fn get_document(
        &self,
        request: &GetDocumentRequest,
        sender: Did,
        tokens: &dyn TokenRegistry,
    ) -> ProcessorResult<Body> {
        let body = self
            .service
            .get_document(&self.account(), &request.document_id)?;

        let mode = match &request.access {
            AccessRequest::Requester => AccessMode::RequesterVerification,
            AccessRequest::NftOwner { registry, token_id } => AccessMode::NftOwnerVerification {
                registry: *registry,
                token_id: token_id.clone(),
            },
            AccessRequest::AccessToken {
                delegating_document_id,
                token_identifier,
            } => AccessMode::AccessTokenVerification {
                delegating_document_id: *delegating_document_id,
                token_identifier: *token_identifier,
            },
        };

        let docs = ServiceDocs {
            service: self.service.as_ref(),
            account: self.account(),
        };
        ReadAccessEvaluator::new(tokens, self.identities.as_ref(), &docs)
            .evaluate(body.core(), &sender, &mode)
            .await?;

        Ok(body)
    }
}

/// Adapter exposing local storage as the delegating-document source for
/// access-token verification.
struct ServiceDocs<'a, R> {
    service: &'a DocumentService<R>,
    account: Did,
}

#[async_trait]
impl<R: DocumentRepository> DelegatingDocs for ServiceDocs<'_, R> {
    async fn get_current(&self, id: &DocumentId) -> pdx_access::AccessResult<Option<Body>> {
        match self.service.get_document(&self.account, id) {
            Ok(body) => Ok(Some(body)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(pdx_access::AccessError::Registry(e.to_string())),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

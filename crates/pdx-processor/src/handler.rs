use std::sync::Arc;

use tracing::warn;

use pdx_access::TokenRegistry;
use pdx_protocol::{
    AnchorDocumentRequest, AnchorDocumentResponse, Envelope, EnvelopeCodec, ErrorBody,
    GetDocumentRequest, GetDocumentResponse, MessageType, SignatureRequest, SignatureResponse,
};
use pdx_store::DocumentRepository;

use crate::error::{ProcessorError, ProcessorResult};
use crate::incoming::ReceivePipeline;

/// Error codes carried in `Error` envelopes.
mod codes {
    pub const BAD_REQUEST: u32 = 1;
    pub const VALIDATION: u32 = 2;
    pub const NOT_FOUND: u32 = 3;
    pub const ACCESS_DENIED: u32 = 4;
    pub const INTERNAL: u32 = 5;
}

/// Entry point for peer messages: routes each envelope to the matching
/// pipeline handler and marshals failures into `Error` envelopes, leaving
/// the channel open.
pub struct MessageHandler<R> {
    pipeline: ReceivePipeline<R>,
    tokens: Arc<dyn TokenRegistry>,
}

impl<R: DocumentRepository> MessageHandler<R> {
    pub fn new(pipeline: ReceivePipeline<R>, tokens: Arc<dyn TokenRegistry>) -> Self {
        Self { pipeline, tokens }
    }

    pub fn pipeline(&self) -> &ReceivePipeline<R> {
        &self.pipeline
    }

    /// Handle one envelope and produce the reply envelope.
    pub async fn handle(&self, envelope: &Envelope) -> Envelope {
        match self.dispatch(envelope).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, from = %envelope.header.sender_id, "peer request failed");
                self.error_envelope(&err)
            }
        }
    }

    async fn dispatch(&self, envelope: &Envelope) -> ProcessorResult<Envelope> {
        let config = self.pipeline.config();
        if envelope.header.network_id != config.network_id {
            return Err(ProcessorError::Validation {
                validator: "handshake".into(),
                reason: format!(
                    "network mismatch: got {}, expected {}",
                    envelope.header.network_id, config.network_id
                ),
            });
        }

        let sender = envelope.header.sender_id;
        match envelope.header.message_type {
            MessageType::RequestSignature => {
                let request: SignatureRequest = EnvelopeCodec::decode_body(&envelope.body)?;
                let signature = self
                    .pipeline
                    .sign_received_document(&request.document, sender)
                    .await?;
                self.reply(
                    MessageType::RequestSignatureRep,
                    &SignatureResponse { signature },
                )
            }
            MessageType::SendAnchored => {
                let request: AnchorDocumentRequest = EnvelopeCodec::decode_body(&envelope.body)?;
                self.pipeline
                    .receive_anchored(&request.document, sender)
                    .await?;
                self.reply(
                    MessageType::SendAnchoredRep,
                    &AnchorDocumentResponse { accepted: true },
                )
            }
            MessageType::GetDocument => {
                let request: GetDocumentRequest = EnvelopeCodec::decode_body(&envelope.body)?;
                let body = self
                    .pipeline
                    .get_document(&request, sender, self.tokens.as_ref())
                    .await?;
                self.reply(
                    MessageType::GetDocumentRep,
                    &GetDocumentResponse {
                        document: body.to_bytes()?,
                    },
                )
            }
            other => Err(ProcessorError::Validation {
                validator: "handshake".into(),
                reason: format!("unexpected message type {}", other.type_name()),
            }),
        }
    }

    fn reply<T: serde::Serialize>(
        &self,
        message_type: MessageType,
        body: &T,
    ) -> ProcessorResult<Envelope> {
        let config = self.pipeline.config();
        Ok(Envelope::new(
            config.identity,
            config.network_id,
            message_type,
            EnvelopeCodec::encode_body(body)?,
        ))
    }

    fn error_envelope(&self, err: &ProcessorError) -> Envelope {
        let code = match err {
            ProcessorError::Protocol(_) | ProcessorError::Body(_) => codes::BAD_REQUEST,
            ProcessorError::NotFound(_) | ProcessorError::UnknownPredecessor(_) => {
                codes::NOT_FOUND
            }
            ProcessorError::Access(_) | ProcessorError::SenderNotCollaborator(_) => {
                codes::ACCESS_DENIED
            }
            ProcessorError::Validation { .. }
            | ProcessorError::AnchorMismatch(_)
            | ProcessorError::AnchorMissing(_)
            | ProcessorError::AnchorNotMonotonic(_) => codes::VALIDATION,
            _ => codes::INTERNAL,
        };

        let config = self.pipeline.config();
        let body = EnvelopeCodec::encode_body(&ErrorBody {
            code,
            message: err.to_string(),
        })
        .unwrap_or_default();
        Envelope::new(config.identity, config.network_id, MessageType::Error, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pdx_access::{AccessError, AccessResult};
    use pdx_anchors::{AnchorRegistry, InMemoryAnchorRegistry};
    use pdx_bodies::{Body, Invoice, InvoiceData};
    use pdx_crypto::SigningKey;
    use pdx_identity::{IdentityService, LocalIdentityService};
    use pdx_protocol::AccessRequest;
    use pdx_store::{DocumentService, InMemoryRepository};
    use pdx_types::Did;

    use crate::config::NodeConfig;

    struct NoTokens;

    #[async_trait]
    impl TokenRegistry for NoTokens {
        async fn owner_of(&self, _registry: Did, _token_id: &[u8]) -> AccessResult<Did> {
            Err(AccessError::Registry("no registry configured".into()))
        }
    }

    fn handler() -> (MessageHandler<InMemoryRepository>, Did, Arc<DocumentService<InMemoryRepository>>) {
        let key = SigningKey::generate();
        let did = key.verifying_key().to_did();
        let identities = Arc::new(LocalIdentityService::new());
        identities.register(did, key.verifying_key());

        let service = Arc::new(DocumentService::new(InMemoryRepository::new()));
        let registry: Arc<dyn AnchorRegistry> = Arc::new(InMemoryAnchorRegistry::new());
        let identities_dyn: Arc<dyn IdentityService> = identities;
        let pipeline = ReceivePipeline::new(
            service.clone(),
            registry,
            identities_dyn,
            key,
            NodeConfig::for_identity(did),
        );
        (MessageHandler::new(pipeline, Arc::new(NoTokens)), did, service)
    }

    #[tokio::test]
    async fn network_mismatch_yields_error_envelope() {
        let (handler, _, _) = handler();
        let envelope = Envelope::new(Did::random(), 999, MessageType::GetDocument, vec![]);

        let reply = handler.handle(&envelope).await;
        assert_eq!(reply.header.message_type, MessageType::Error);
        let body: ErrorBody = EnvelopeCodec::decode_body(&reply.body).unwrap();
        assert_eq!(body.code, codes::VALIDATION);
        assert!(body.message.contains("network mismatch"));
    }

    #[tokio::test]
    async fn reply_types_are_rejected() {
        let (handler, _, _) = handler();
        let envelope = Envelope::new(Did::random(), 1, MessageType::SendAnchoredRep, vec![]);

        let reply = handler.handle(&envelope).await;
        assert_eq!(reply.header.message_type, MessageType::Error);
    }

    #[tokio::test]
    async fn get_document_round_trip() {
        let (handler, node_did, service) = handler();
        let requester = Did::random();

        let body = Body::Invoice(Invoice::new(
            InvoiceData {
                invoice_number: "INV-9".into(),
                ..Default::default()
            },
            vec![node_did, requester],
        ));
        service.create(&node_did, &body).unwrap();

        let request = GetDocumentRequest {
            document_id: body.core().document_id,
            access: AccessRequest::Requester,
        };
        let envelope = Envelope::new(
            requester,
            1,
            MessageType::GetDocument,
            EnvelopeCodec::encode_body(&request).unwrap(),
        );

        let reply = handler.handle(&envelope).await;
        assert_eq!(reply.header.message_type, MessageType::GetDocumentRep);
        assert_eq!(reply.header.sender_id, node_did);

        let response: GetDocumentResponse = EnvelopeCodec::decode_body(&reply.body).unwrap();
        let returned = Body::from_bytes(&response.document).unwrap();
        assert_eq!(returned.core().document_id, body.core().document_id);
    }

    #[tokio::test]
    async fn stranger_get_document_is_denied() {
        let (handler, node_did, service) = handler();

        let body = Body::Invoice(Invoice::new(InvoiceData::default(), vec![node_did]));
        service.create(&node_did, &body).unwrap();

        let request = GetDocumentRequest {
            document_id: body.core().document_id,
            access: AccessRequest::Requester,
        };
        let envelope = Envelope::new(
            Did::random(),
            1,
            MessageType::GetDocument,
            EnvelopeCodec::encode_body(&request).unwrap(),
        );

        let reply = handler.handle(&envelope).await;
        assert_eq!(reply.header.message_type, MessageType::Error);
        let error: ErrorBody = EnvelopeCodec::decode_body(&reply.body).unwrap();
        assert_eq!(error.code, codes::ACCESS_DENIED);
    }
}

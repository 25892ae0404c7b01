use async_trait::async_trait;
use tracing::debug;

use pdx_bodies::Body;
use pdx_document::CoreDocument;
use pdx_identity::IdentityService;
use pdx_types::{Did, DocumentId};

use crate::error::{AccessError, AccessResult};

/// NFT ownership lookup against a token registry.
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    /// The current owner of `token_id` at `registry`.
    async fn owner_of(&self, registry: Did, token_id: &[u8]) -> AccessResult<Did>;
}

/// Source of delegating documents for access-token verification.
#[async_trait]
pub trait DelegatingDocs: Send + Sync {
    /// The current version of the document, if present locally.
    async fn get_current(&self, id: &DocumentId) -> AccessResult<Option<Body>>;
}

/// How a requester claims read access.
#[derive(Clone, Debug)]
pub enum AccessMode {
    /// The requester is a collaborator reachable via a read rule.
    RequesterVerification,
    /// The requester owns an NFT bound to the document.
    NftOwnerVerification { registry: Did, token_id: Vec<u8> },
    /// A collaborator delegated access through a token embedded in a
    /// delegating document.
    AccessTokenVerification {
        delegating_document_id: DocumentId,
        token_identifier: [u8; 32],
    },
}

/// Decides read access for a requester on a document.
pub struct ReadAccessEvaluator<'a> {
    tokens: &'a dyn TokenRegistry,
    identities: &'a dyn IdentityService,
    documents: &'a dyn DelegatingDocs,
}

impl<'a> ReadAccessEvaluator<'a> {
    pub fn new(
        tokens: &'a dyn TokenRegistry,
        identities: &'a dyn IdentityService,
        documents: &'a dyn DelegatingDocs,
    ) -> Self {
        Self {
            tokens,
            identities,
            documents,
        }
    }

    /// Evaluate `requester`'s claim to read `document` under `mode`.
    pub async fn evaluate(
        &self,
        document: &CoreDocument,
        requester: &Did,
        mode: &AccessMode,
    ) -> AccessResult<()> {
        match mode {
            AccessMode::RequesterVerification => {
                if document.account_can_read(requester) {
                    Ok(())
                } else {
                    Err(AccessError::ReadDenied(*requester))
                }
            }
            AccessMode::NftOwnerVerification { registry, token_id } => {
                self.nft_owner_can_read(document, *registry, token_id, requester)
                    .await
            }
            AccessMode::AccessTokenVerification {
                delegating_document_id,
                token_identifier,
            } => {
                self.grantee_can_read(
                    document,
                    delegating_document_id,
                    token_identifier,
                    requester,
                )
                .await
            }
        }
    }

    async fn nft_owner_can_read(
        &self,
        document: &CoreDocument,
        registry: Did,
        token_id: &[u8],
        requester: &Did,
    ) -> AccessResult<()> {
        // Collaborators read without consulting the registry.
        if document.account_can_read(requester) {
            return Ok(());
        }

        if !document.nft_grants_read(registry, token_id) {
            return Err(AccessError::NftNotBound);
        }

        let owner = self.tokens.owner_of(registry, token_id).await?;
        if owner != *requester {
            debug!(%owner, %requester, "NFT owner mismatch");
            return Err(AccessError::NotNftOwner {
                owner,
                requester: *requester,
            });
        }
        Ok(())
    }

    async fn grantee_can_read(
        &self,
        document: &CoreDocument,
        delegating_document_id: &DocumentId,
        token_identifier: &[u8; 32],
        requester: &Did,
    ) -> AccessResult<()> {
        let delegating = self
            .documents
            .get_current(delegating_document_id)
            .await?
            .ok_or(AccessError::DelegatingDocumentNotFound)?;

        let token = delegating
            .core()
            .find_access_token(token_identifier)
            .ok_or(AccessError::AccessTokenNotFound)?;

        if token.grantee != *requester {
            return Err(AccessError::ReadDenied(*requester));
        }
        if token.document_identifier != document.document_id {
            return Err(AccessError::TokenScopeMismatch);
        }

        let granter_key = self.identities.resolve_key(&token.granter).await?;
        token
            .verify(&granter_key)
            .map_err(|_| AccessError::InvalidAccessToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdx_bodies::{Invoice, InvoiceData};
    use pdx_crypto::SigningKey;
    use pdx_document::AccessToken;
    use pdx_identity::LocalIdentityService;
    use pdx_types::RoleKey;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedRegistry {
        owners: HashMap<Vec<u8>, Did>,
    }

    #[async_trait]
    impl TokenRegistry for FixedRegistry {
        async fn owner_of(&self, _registry: Did, token_id: &[u8]) -> AccessResult<Did> {
            self.owners
                .get(token_id)
                .copied()
                .ok_or_else(|| AccessError::Registry("no owner".into()))
        }
    }

    struct DocMap {
        docs: Mutex<HashMap<DocumentId, Body>>,
    }

    #[async_trait]
    impl DelegatingDocs for DocMap {
        async fn get_current(&self, id: &DocumentId) -> AccessResult<Option<Body>> {
            Ok(self.docs.lock().expect("lock poisoned").get(id).cloned())
        }
    }

    fn empty_docs() -> DocMap {
        DocMap {
            docs: Mutex::new(HashMap::new()),
        }
    }

    #[tokio::test]
    async fn collaborator_can_read() {
        let collaborator = Did::random();
        let doc = CoreDocument::new(vec![collaborator]);
        let registry = FixedRegistry { owners: HashMap::new() };
        let identities = LocalIdentityService::new();
        let docs = empty_docs();
        let evaluator = ReadAccessEvaluator::new(&registry, &identities, &docs);

        assert!(evaluator
            .evaluate(&doc, &collaborator, &AccessMode::RequesterVerification)
            .await
            .is_ok());

        let stranger = Did::random();
        let err = evaluator
            .evaluate(&doc, &stranger, &AccessMode::RequesterVerification)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::ReadDenied(d) if d == stranger));
    }

    #[tokio::test]
    async fn nft_owner_reads_iff_registry_agrees() {
        let registry_addr = Did::random();
        let token = vec![7u8; 32];
        let owner = Did::random();

        let mut doc = CoreDocument::new(vec![Did::random()]);
        doc.add_nft(true, registry_addr, &token).unwrap();

        let registry = FixedRegistry {
            owners: HashMap::from([(token.clone(), owner)]),
        };
        let identities = LocalIdentityService::new();
        let docs = empty_docs();
        let evaluator = ReadAccessEvaluator::new(&registry, &identities, &docs);

        let mode = AccessMode::NftOwnerVerification {
            registry: registry_addr,
            token_id: token.clone(),
        };

        assert!(evaluator.evaluate(&doc, &owner, &mode).await.is_ok());

        let not_owner = Did::random();
        let err = evaluator.evaluate(&doc, &not_owner, &mode).await.unwrap_err();
        assert!(matches!(err, AccessError::NotNftOwner { .. }));
    }

    #[tokio::test]
    async fn unbound_nft_is_rejected() {
        let doc = CoreDocument::new(vec![Did::random()]);
        let registry = FixedRegistry { owners: HashMap::new() };
        let identities = LocalIdentityService::new();
        let docs = empty_docs();
        let evaluator = ReadAccessEvaluator::new(&registry, &identities, &docs);

        let err = evaluator
            .evaluate(
                &doc,
                &Did::random(),
                &AccessMode::NftOwnerVerification {
                    registry: Did::random(),
                    token_id: vec![1u8; 32],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NftNotBound));
    }

    #[tokio::test]
    async fn access_token_grants_read() {
        let granter = Did::random();
        let grantee = Did::random();
        let granter_key = SigningKey::generate();

        let target = CoreDocument::new(vec![granter]);

        let mut delegating = Invoice::new(InvoiceData::default(), vec![granter]);
        let token = AccessToken::new_signed(
            granter,
            grantee,
            RoleKey::random(),
            b"key-1".to_vec(),
            target.document_id,
            &granter_key,
        );
        let token_id = token.identifier;
        delegating.core.add_access_token(token);
        let delegating = Body::Invoice(delegating);
        let delegating_id = delegating.core().document_id;

        let identities = LocalIdentityService::new();
        identities.register(granter, granter_key.verifying_key());
        let registry = FixedRegistry { owners: HashMap::new() };
        let docs = DocMap {
            docs: Mutex::new(HashMap::from([(delegating_id, delegating)])),
        };
        let evaluator = ReadAccessEvaluator::new(&registry, &identities, &docs);

        let mode = AccessMode::AccessTokenVerification {
            delegating_document_id: delegating_id,
            token_identifier: token_id,
        };

        assert!(evaluator.evaluate(&target, &grantee, &mode).await.is_ok());

        // a different requester cannot use the grantee's token
        let err = evaluator
            .evaluate(&target, &Did::random(), &mode)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::ReadDenied(_)));

        // the token does not cover other documents
        let other = CoreDocument::new(vec![granter]);
        let err = evaluator.evaluate(&other, &grantee, &mode).await.unwrap_err();
        assert!(matches!(err, AccessError::TokenScopeMismatch));
    }

    #[tokio::test]
    async fn missing_delegating_document_fails() {
        let doc = CoreDocument::new(vec![Did::random()]);
        let registry = FixedRegistry { owners: HashMap::new() };
        let identities = LocalIdentityService::new();
        let docs = empty_docs();
        let evaluator = ReadAccessEvaluator::new(&registry, &identities, &docs);

        let err = evaluator
            .evaluate(
                &doc,
                &Did::random(),
                &AccessMode::AccessTokenVerification {
                    delegating_document_id: doc.document_id,
                    token_identifier: [9u8; 32],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::DelegatingDocumentNotFound));
    }
}

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use pdx_crypto::{Signature, VerifyingKey};
use pdx_types::Did;

use crate::error::{IdentityError, IdentityResult};

/// Resolves participant identities and verifies their signatures.
///
/// The document core never holds keys for other participants; every
/// signature check goes through this seam.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolve the identity's active verifying key.
    async fn resolve_key(&self, did: &Did) -> IdentityResult<VerifyingKey>;

    /// Verify `signature` over `message` with the identity's active key.
    async fn verify_signature(
        &self,
        did: &Did,
        message: &[u8],
        signature: &[u8],
    ) -> IdentityResult<()>;

    /// Returns `true` if the identity is known.
    async fn exists(&self, did: &Did) -> IdentityResult<bool>;
}

/// In-memory identity service for tests and embedding.
pub struct LocalIdentityService {
    keys: RwLock<HashMap<Did, VerifyingKey>>,
}

impl LocalIdentityService {
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Register an identity's verifying key. Replaces any previous key
    /// (key rotation).
    pub fn register(&self, did: Did, key: VerifyingKey) {
        self.keys.write().expect("lock poisoned").insert(did, key);
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.keys.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().expect("lock poisoned").is_empty()
    }
}

impl Default for LocalIdentityService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityService for LocalIdentityService {
    async fn resolve_key(&self, did: &Did) -> IdentityResult<VerifyingKey> {
        self.keys
            .read()
            .expect("lock poisoned")
            .get(did)
            .cloned()
            .ok_or(IdentityError::UnknownIdentity(*did))
    }

    async fn verify_signature(
        &self,
        did: &Did,
        message: &[u8],
        signature: &[u8],
    ) -> IdentityResult<()> {
        let key = self.resolve_key(did).await?;
        let sig = Signature::from_slice(signature)
            .map_err(|_| IdentityError::InvalidSignature(*did))?;
        key.verify(message, &sig)
            .map_err(|_| IdentityError::InvalidSignature(*did))
    }

    async fn exists(&self, did: &Did) -> IdentityResult<bool> {
        Ok(self.keys.read().expect("lock poisoned").contains_key(did))
    }
}

use serde::{Deserialize, Serialize};

use pdx_crypto::{ContentHasher, Signature, SignatureError, SigningKey, VerifyingKey};
use pdx_types::{Did, DocumentId, RoleKey};

/// A signed delegation embedded in a "delegating" document, granting the
/// grantee read access to the referenced document.
///
/// The signature covers `granter ‖ grantee ‖ role ‖ key ‖ document` and is
/// checked against the granter's active key resolved through the identity
/// service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub identifier: [u8; 32],
    pub granter: Did,
    pub grantee: Did,
    pub role_identifier: RoleKey,
    pub key_identifier: Vec<u8>,
    pub document_identifier: DocumentId,
    /// 64-byte signature by the granter's key.
    pub signature: Vec<u8>,
}

impl AccessToken {
    /// Create and sign a token with the granter's key.
    pub fn new_signed(
        granter: Did,
        grantee: Did,
        role_identifier: RoleKey,
        key_identifier: Vec<u8>,
        document_identifier: DocumentId,
        key: &SigningKey,
    ) -> Self {
        let mut identifier = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut identifier);
        let payload = signing_payload(
            &granter,
            &grantee,
            &role_identifier,
            &key_identifier,
            &document_identifier,
        );
        let signature = key.sign(&payload).to_bytes().to_vec();
        Self {
            identifier,
            granter,
            grantee,
            role_identifier,
            key_identifier,
            document_identifier,
            signature,
        }
    }

    /// Verify the token signature against the granter's resolved key.
    pub fn verify(&self, granter_key: &VerifyingKey) -> Result<(), SignatureError> {
        let payload = signing_payload(
            &self.granter,
            &self.grantee,
            &self.role_identifier,
            &self.key_identifier,
            &self.document_identifier,
        );
        let signature = Signature::from_slice(&self.signature)?;
        granter_key.verify(&payload, &signature)
    }
}

fn signing_payload(
    granter: &Did,
    grantee: &Did,
    role: &RoleKey,
    key: &[u8],
    document: &DocumentId,
) -> Vec<u8> {
    ContentHasher::ACCESS_TOKEN
        .hash_parts(&[
            granter.as_bytes(),
            grantee.as_bytes(),
            role.as_bytes(),
            key,
            document.as_bytes(),
        ])
        .to_vec()
}

use serde::{Deserialize, Serialize};
use serde_json::json;

use pdx_types::Did;

/// A collaborator's signature over a signing root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSignature {
    pub signer_id: Did,
    pub public_key: [u8; 32],
    /// 64-byte ed25519 signature over the signing root.
    pub signature: Vec<u8>,
    /// Unix seconds at signing time.
    pub timestamp: u64,
}

/// The ordered set of signatures on a document version.
///
/// Appends are idempotent by `(signer_id, signature bytes)`, and the leaf
/// encoding sorts by the same key, so the signatures root depends on the
/// set rather than insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureData {
    pub signatures: Vec<DocumentSignature>,
}

impl SignatureData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a signature. A duplicate by `(signer_id, signature)` is a
    /// no-op; returns `true` if the signature was added.
    pub fn append(&mut self, sig: DocumentSignature) -> bool {
        let dup = self
            .signatures
            .iter()
            .any(|s| s.signer_id == sig.signer_id && s.signature == sig.signature);
        if dup {
            return false;
        }
        self.signatures.push(sig);
        true
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Signatures sorted by `(signer_id, signature bytes)`.
    pub fn sorted(&self) -> Vec<&DocumentSignature> {
        let mut sigs: Vec<&DocumentSignature> = self.signatures.iter().collect();
        sigs.sort_by(|a, b| {
            a.signer_id
                .cmp(&b.signer_id)
                .then_with(|| a.signature.cmp(&b.signature))
        });
        sigs
    }

    /// Distinct signer identities.
    pub fn signers(&self) -> Vec<Did> {
        let mut signers: Vec<Did> = self.signatures.iter().map(|s| s.signer_id).collect();
        signers.sort();
        signers.dedup();
        signers
    }

    /// The canonical value the signatures tree is built over. The count
    /// leaf keeps the tree non-empty before any signature lands and commits
    /// the set size.
    pub fn leaf_value(&self) -> serde_json::Value {
        let entries: Vec<serde_json::Value> = self
            .sorted()
            .into_iter()
            .map(|s| {
                json!({
                    "signer_id": s.signer_id.to_hex(),
                    "public_key": hex::encode(s.public_key),
                    "signature": hex::encode(&s.signature),
                    "timestamp": s.timestamp,
                })
            })
            .collect();
        json!({ "count": entries.len(), "signatures": entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(seed: u8) -> DocumentSignature {
        DocumentSignature {
            signer_id: Did::from_raw([seed; 20]),
            public_key: [seed; 32],
            signature: vec![seed; 64],
            timestamp: 1_700_000_000 + seed as u64,
        }
    }

    #[test]
    fn append_is_idempotent() {
        let mut data = SignatureData::new();
        assert!(data.append(sig(1)));
        assert!(!data.append(sig(1)));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn same_signer_different_signature_is_kept() {
        let mut data = SignatureData::new();
        data.append(sig(1));
        let mut second = sig(1);
        second.signature = vec![9; 64];
        assert!(data.append(second));
        assert_eq!(data.len(), 2);
        assert_eq!(data.signers().len(), 1);
    }

    #[test]
    fn leaf_value_is_order_independent() {
        let mut forward = SignatureData::new();
        forward.append(sig(1));
        forward.append(sig(2));

        let mut backward = SignatureData::new();
        backward.append(sig(2));
        backward.append(sig(1));

        assert_eq!(forward.leaf_value(), backward.leaf_value());
    }

    #[test]
    fn signers_are_deduped() {
        let mut data = SignatureData::new();
        data.append(sig(3));
        let mut again = sig(3);
        again.signature = vec![7; 64];
        data.append(again);
        data.append(sig(4));
        assert_eq!(data.signers().len(), 2);
    }
}

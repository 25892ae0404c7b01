use async_trait::async_trait;
use sha3::{Digest, Keccak256};
use tracing::{info, warn};

use pdx_types::Did;

use crate::error::IdentityResult;

/// The on-chain identity factory, as seen by the core.
#[async_trait]
pub trait FactoryContract: Send + Sync {
    /// The factory's current transaction nonce.
    async fn nonce(&self) -> IdentityResult<u64>;

    /// Submit the creation transaction and return the address carried by
    /// the `IdentityCreated` event.
    async fn create_identity(&self) -> IdentityResult<Did>;

    /// Returns `true` if the address was created by this factory.
    async fn created_identity(&self, did: &Did) -> IdentityResult<bool>;
}

/// Creates identities through the factory contract.
///
/// The address of a new identity is predicted from the factory address and
/// its nonce before submission. Prediction can race with other factory
/// transactions; the authoritative value is always the one in the
/// `IdentityCreated` event, and a diagnostic is emitted when they differ.
pub struct IdentityFactory<C> {
    factory_address: Did,
    contract: C,
}

impl<C: FactoryContract> IdentityFactory<C> {
    pub fn new(factory_address: Did, contract: C) -> Self {
        Self {
            factory_address,
            contract,
        }
    }

    /// Predict the address the factory will assign at `nonce`:
    /// `keccak256(rlp(factory_address, nonce))[12:]`, the standard
    /// contract-creation address derivation.
    pub fn predict_address(factory_address: &Did, nonce: u64) -> Did {
        let hash = keccak256(&rlp_address_nonce(factory_address, nonce));
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&hash[12..]);
        Did::from_raw(addr)
    }

    /// Create a new identity and return its address.
    pub async fn create_identity(&self) -> IdentityResult<Did> {
        let nonce = self.contract.nonce().await?;
        let predicted = Self::predict_address(&self.factory_address, nonce);

        let created = self.contract.create_identity().await?;
        if created != predicted {
            warn!(%predicted, %created, "identity address prediction raced; trusting event value");
        }
        info!(%created, "identity created");
        Ok(created)
    }

    /// Returns `true` if the identity was created by this factory.
    pub async fn identity_exists(&self, did: &Did) -> IdentityResult<bool> {
        self.contract.created_identity(did).await
    }
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// RLP encoding of the two-item list `[address, nonce]`.
///
/// The payload is at most 21 + 9 bytes, so the short list form always
/// applies.
fn rlp_address_nonce(address: &Did, nonce: u64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(30);
    // 20-byte string
    payload.push(0x80 + 20);
    payload.extend_from_slice(address.as_bytes());
    // nonce as a minimal big-endian integer
    let bytes = nonce.to_be_bytes();
    let stripped = &bytes[bytes.iter().take_while(|b| **b == 0).count()..];
    match stripped {
        [] => payload.push(0x80),
        [single] if *single < 0x80 => payload.push(*single),
        _ => {
            payload.push(0x80 + stripped.len() as u8);
            payload.extend_from_slice(stripped);
        }
    }

    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(0xc0 + payload.len() as u8);
    out.extend_from_slice(&payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// A factory contract whose event value honours the prediction.
    struct WellBehaved {
        address: Did,
        nonce: Mutex<u64>,
        created: Mutex<HashSet<Did>>,
    }

    #[async_trait]
    impl FactoryContract for WellBehaved {
        async fn nonce(&self) -> IdentityResult<u64> {
            Ok(*self.nonce.lock().expect("lock poisoned"))
        }

        async fn create_identity(&self) -> IdentityResult<Did> {
            let mut nonce = self.nonce.lock().expect("lock poisoned");
            let did = IdentityFactory::<WellBehaved>::predict_address(&self.address, *nonce);
            *nonce += 1;
            self.created.lock().expect("lock poisoned").insert(did);
            Ok(did)
        }

        async fn created_identity(&self, did: &Did) -> IdentityResult<bool> {
            Ok(self.created.lock().expect("lock poisoned").contains(did))
        }
    }

    /// A factory contract that always lands one nonce ahead.
    struct Racing {
        address: Did,
    }

    #[async_trait]
    impl FactoryContract for Racing {
        async fn nonce(&self) -> IdentityResult<u64> {
            Ok(0)
        }

        async fn create_identity(&self) -> IdentityResult<Did> {
            Ok(IdentityFactory::<Racing>::predict_address(&self.address, 1))
        }

        async fn created_identity(&self, _did: &Did) -> IdentityResult<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn created_address_matches_prediction() {
        let address = Did::random();
        let contract = WellBehaved {
            address,
            nonce: Mutex::new(0),
            created: Mutex::new(HashSet::new()),
        };
        let factory = IdentityFactory::new(address, contract);

        let did = factory.create_identity().await.unwrap();
        assert_eq!(did, IdentityFactory::<WellBehaved>::predict_address(&address, 0));
        assert!(factory.identity_exists(&did).await.unwrap());
    }

    #[tokio::test]
    async fn successive_identities_differ() {
        let address = Did::random();
        let contract = WellBehaved {
            address,
            nonce: Mutex::new(0),
            created: Mutex::new(HashSet::new()),
        };
        let factory = IdentityFactory::new(address, contract);

        let first = factory.create_identity().await.unwrap();
        let second = factory.create_identity().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn event_value_wins_on_race() {
        let address = Did::random();
        let factory = IdentityFactory::new(address, Racing { address });

        // prediction is for nonce 0, the event reports nonce 1's address
        let did = factory.create_identity().await.unwrap();
        assert_eq!(did, IdentityFactory::<Racing>::predict_address(&address, 1));
    }

    #[test]
    fn prediction_is_deterministic() {
        let address = Did::random();
        assert_eq!(
            IdentityFactory::<Racing>::predict_address(&address, 7),
            IdentityFactory::<Racing>::predict_address(&address, 7),
        );
        assert_ne!(
            IdentityFactory::<Racing>::predict_address(&address, 7),
            IdentityFactory::<Racing>::predict_address(&address, 8),
        );
        assert_ne!(
            IdentityFactory::<Racing>::predict_address(&address, 7),
            IdentityFactory::<Racing>::predict_address(&Did::random(), 7),
        );
    }

    #[test]
    fn keccak256_known_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c907e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn rlp_encodes_zero_nonce() {
        let address = Did::from_raw([0xaa; 20]);
        let encoded = rlp_address_nonce(&address, 0);
        assert_eq!(encoded[0], 0xc0 + 22);
        assert_eq!(encoded[1], 0x80 + 20);
        assert_eq!(&encoded[2..22], address.as_bytes());
        assert_eq!(encoded[22], 0x80);
        assert_eq!(encoded.len(), 23);
    }

    #[test]
    fn rlp_encodes_small_nonce_as_single_byte() {
        let address = Did::from_raw([0xaa; 20]);
        let encoded = rlp_address_nonce(&address, 0x7f);
        assert_eq!(encoded[0], 0xc0 + 22);
        assert_eq!(encoded[22], 0x7f);
    }

    #[test]
    fn rlp_encodes_multi_byte_nonce() {
        let address = Did::from_raw([0xaa; 20]);
        let encoded = rlp_address_nonce(&address, 0x0400);
        assert_eq!(encoded[0], 0xc0 + 24);
        assert_eq!(encoded[22], 0x80 + 2);
        assert_eq!(&encoded[23..], &[0x04, 0x00]);
    }

    #[test]
    fn rlp_nonce_0x80_needs_a_length_prefix() {
        let address = Did::from_raw([0xaa; 20]);
        let encoded = rlp_address_nonce(&address, 0x80);
        assert_eq!(encoded[22], 0x80 + 1);
        assert_eq!(encoded[23], 0x80);
    }

    #[test]
    fn predicted_address_matches_create_derivation() {
        // keccak256(rlp([address, nonce]))[12:], checked against the
        // full hash computed here from the same encoding.
        let address = Did::from_raw([0x11; 20]);
        let nonce = 3;
        let hash = keccak256(&rlp_address_nonce(&address, nonce));
        let predicted = IdentityFactory::<Racing>::predict_address(&address, nonce);
        assert_eq!(predicted.as_bytes(), &hash[12..]);
    }
}

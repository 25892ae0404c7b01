use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A participant address: a 20-byte Ethereum-style identifier.
///
/// DIDs name collaborators, signers, and NFT owners. Parsing is
/// case-insensitive; two DIDs are equal iff their bytes are equal, so
/// mixed-case hex input never produces distinct identities.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Did([u8; 20]);

impl Did {
    /// Create a `Did` from raw 20 bytes.
    pub const fn from_raw(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create a `Did` from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: 20,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Parse from a hex string (40 hex characters, `0x` prefix tolerated,
    /// any case).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s.to_ascii_lowercase())
            .map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Generate a random DID for tests and demos.
    pub fn random() -> Self {
        let mut bytes = [0u8; 20];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// The raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex representation.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// The address right-padded with zeros to 32 bytes, as used for NFT
    /// registry identifiers.
    pub fn padded_to_32(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..20].copy_from_slice(&self.0);
        out
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did(0x{})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

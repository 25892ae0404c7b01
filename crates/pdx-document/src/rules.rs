use serde::{Deserialize, Serialize};

use pdx_types::{Did, RoleKey};

use crate::error::{DocumentError, DocumentResult};

/// What a read rule grants to its roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadAction {
    /// The role may read the document.
    Read,
    /// The role may read the document and is asked to sign new versions.
    ReadSign,
}

/// How a transition rule's `field` bytes are matched against a changed
/// leaf's compact property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldMatchType {
    /// The compact property must equal `field` exactly.
    Exact,
    /// The compact property must start with `field`. An empty `field`
    /// matches every leaf (a global rule).
    Prefix,
}

/// What a transition rule grants. Rules only ever allow; a change with no
/// covering rule is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionAction {
    Allow,
}

/// A named set of collaborators and NFT bindings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub key: RoleKey,
    pub collaborators: Vec<Did>,
    /// NFT entries: `registry_id(32) ‖ token_id(32)`.
    pub nfts: Vec<Vec<u8>>,
}

impl Role {
    /// A fresh role with a random key and the given collaborators.
    pub fn with_collaborators(collaborators: Vec<Did>) -> Self {
        Self {
            key: RoleKey::random(),
            collaborators,
            nfts: Vec::new(),
        }
    }

    /// A fresh role bound to a single NFT entry.
    pub fn with_nft(entry: Vec<u8>) -> Self {
        Self {
            key: RoleKey::random(),
            collaborators: Vec::new(),
            nfts: vec![entry],
        }
    }
}

/// Grants `action` to the listed roles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRule {
    pub roles: Vec<RoleKey>,
    pub action: ReadAction,
}

/// Restricts which leaf-property prefixes the listed roles may change
/// across versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub roles: Vec<RoleKey>,
    pub match_type: FieldMatchType,
    /// Compact property bytes the rule covers.
    pub field: Vec<u8>,
    pub action: TransitionAction,
}

impl TransitionRule {
    /// A rule permitting the given roles to change every leaf.
    pub fn global(roles: Vec<RoleKey>) -> Self {
        Self {
            roles,
            match_type: FieldMatchType::Prefix,
            field: Vec::new(),
            action: TransitionAction::Allow,
        }
    }

    /// A rule permitting the given roles to change leaves under a compact
    /// prefix.
    pub fn prefix(roles: Vec<RoleKey>, field: Vec<u8>) -> Self {
        Self {
            roles,
            match_type: FieldMatchType::Prefix,
            field,
            action: TransitionAction::Allow,
        }
    }

    /// Returns `true` if the rule covers the compact property bytes.
    pub fn matches(&self, compact_property: &[u8]) -> bool {
        match self.match_type {
            FieldMatchType::Exact => compact_property == self.field.as_slice(),
            FieldMatchType::Prefix => compact_property.starts_with(&self.field),
        }
    }
}

/// An NFT bound to a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    /// The 20-byte token registry address, right-padded to 32 bytes.
    pub registry_id: [u8; 32],
    pub token_id: [u8; 32],
}

impl Nft {
    /// Build an NFT binding, validating the token length.
    pub fn new(registry: Did, token_id: &[u8]) -> DocumentResult<Self> {
        let token: [u8; 32] = token_id
            .try_into()
            .map_err(|_| DocumentError::InvalidNftToken(token_id.len()))?;
        Ok(Self {
            registry_id: registry.padded_to_32(),
            token_id: token,
        })
    }

    /// The role NFT entry: `registry_id ‖ token_id` (64 bytes).
    pub fn role_entry(&self) -> Vec<u8> {
        let mut entry = Vec::with_capacity(64);
        entry.extend_from_slice(&self.registry_id);
        entry.extend_from_slice(&self.token_id);
        entry
    }

    /// The registry address (first 20 bytes of the registry identifier).
    pub fn registry(&self) -> Did {
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&self.registry_id[..20]);
        Did::from_raw(addr)
    }
}

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::json;

use pdx_crypto::HashPair;
use pdx_tree::{traverse, DocumentTree, LeafNode, Proof};
use pdx_types::{Did, DocumentId, Preimage, RoleKey, Salt, VersionId};

use crate::access_token::AccessToken;
use crate::error::{DocumentError, DocumentResult};
use crate::fields::{
    field_property, prefix_property, CD_TREE_PREFIX, DOCUMENT_TYPE_FIELD, DR_TREE_PREFIX,
    SIGNATURES_ROOT_FIELD, SIGNATURES_TREE_PREFIX, SIGNING_ROOT_FIELD, SIGNING_TREE_PREFIX,
    CD_ROOT_FIELD, DATA_ROOT_FIELD,
};
use crate::rules::{Nft, ReadAction, ReadRule, Role, TransitionRule};
use crate::signature::{DocumentSignature, SignatureData};

/// The envelope wrapping any typed document body.
///
/// A `CoreDocument` holds the version lineage, the collaborator-scoped
/// access rules, NFT bindings, access tokens, signatures, per-leaf salts,
/// and the cached roots. The embedded body lives in the typed model (see
/// `pdx-bodies`); the envelope only ever sees its data root and type URL.
///
/// A version is mutable in two windows: between creation and signing-root
/// calculation (field edits), and between signing-root and document-root
/// calculation (signature appends). Once the document root is anchored the
/// version is immutable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreDocument {
    pub document_id: DocumentId,
    pub current_version: VersionId,
    pub current_preimage: Preimage,
    pub next_version: VersionId,
    pub next_preimage: Preimage,
    pub previous_version: Option<VersionId>,
    /// Document root of the prior version; absent for v0.
    pub previous_root: Option<[u8; 32]>,

    pub roles: Vec<Role>,
    pub read_rules: Vec<ReadRule>,
    pub transition_rules: Vec<TransitionRule>,
    pub nfts: Vec<Nft>,
    pub access_tokens: Vec<AccessToken>,
    pub signature_data: SignatureData,

    /// Author and time of the last update, set by [`add_update_log`](Self::add_update_log).
    pub author: Option<Did>,
    pub timestamp: Option<u64>,

    envelope_salts: Option<Vec<Salt>>,
    signature_salts: Option<Vec<Salt>>,

    data_root: Option<[u8; 32]>,
    signing_root: Option<[u8; 32]>,
    document_root: Option<[u8; 32]>,
}

impl CoreDocument {
    /// Create version zero.
    ///
    /// Generates the current and next `(preimage, version)` pairs, sets
    /// `document_id` to the current version, and initialises one role
    /// holding all collaborators with a READ_SIGN read rule and a global
    /// transition rule.
    pub fn new(collaborators: Vec<Did>) -> Self {
        let current = HashPair::generate();
        let next = HashPair::generate();

        let mut doc = Self {
            document_id: current.version,
            current_version: current.version,
            current_preimage: current.preimage,
            next_version: next.version,
            next_preimage: next.preimage,
            previous_version: None,
            previous_root: None,
            roles: Vec::new(),
            read_rules: Vec::new(),
            transition_rules: Vec::new(),
            nfts: Vec::new(),
            access_tokens: Vec::new(),
            signature_data: SignatureData::new(),
            author: None,
            timestamp: None,
            envelope_salts: None,
            signature_salts: None,
            data_root: None,
            signing_root: None,
            document_root: None,
        };

        if !collaborators.is_empty() {
            let role = Role::with_collaborators(collaborators);
            let key = role.key;
            doc.roles.push(role);
            doc.read_rules.push(ReadRule {
                roles: vec![key],
                action: ReadAction::ReadSign,
            });
            doc.transition_rules.push(TransitionRule::global(vec![key]));
        }

        doc
    }

    /// Derive the next version of this document.
    ///
    /// Requires the predecessor's document root to be set. Carries forward
    /// roles, rules, NFTs, and access tokens; collaborators not already
    /// present are added under a fresh READ_SIGN role with a transition
    /// rule covering `body_prefix`.
    pub fn prepare_new_version(
        &self,
        collaborators: Vec<Did>,
        init_salts: bool,
        body_prefix: &[u8],
    ) -> DocumentResult<CoreDocument> {
        let previous_root = self.document_root.ok_or(DocumentError::InvalidPreviousRoot)?;

        let existing = self.collaborators(&[]);
        let added: Vec<Did> = collaborators
            .into_iter()
            .filter(|c| !existing.contains(c))
            .collect();

        let next = HashPair::generate();
        let mut doc = Self {
            document_id: self.document_id,
            current_version: self.next_version,
            current_preimage: self.next_preimage,
            next_version: next.version,
            next_preimage: next.preimage,
            previous_version: Some(self.current_version),
            previous_root: Some(previous_root),
            roles: self.roles.clone(),
            read_rules: self.read_rules.clone(),
            transition_rules: self.transition_rules.clone(),
            nfts: self.nfts.clone(),
            access_tokens: self.access_tokens.clone(),
            signature_data: SignatureData::new(),
            author: None,
            timestamp: None,
            envelope_salts: None,
            signature_salts: None,
            data_root: None,
            signing_root: None,
            document_root: None,
        };

        if !added.is_empty() {
            let role = Role::with_collaborators(added);
            let key = role.key;
            doc.roles.push(role);
            doc.read_rules.push(ReadRule {
                roles: vec![key],
                action: ReadAction::ReadSign,
            });
            doc.transition_rules
                .push(TransitionRule::prefix(vec![key], body_prefix.to_vec()));
        }

        if init_salts {
            doc.ensure_envelope_salts();
        }

        Ok(doc)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Bind an NFT to the document. With `grant_read_access`, a new role
    /// holding the NFT entry and a READ rule are appended as well.
    pub fn add_nft(
        &mut self,
        grant_read_access: bool,
        registry: Did,
        token_id: &[u8],
    ) -> DocumentResult<()> {
        let nft = Nft::new(registry, token_id)?;

        if grant_read_access {
            let role = Role::with_nft(nft.role_entry());
            let key = role.key;
            self.roles.push(role);
            self.read_rules.push(ReadRule {
                roles: vec![key],
                action: ReadAction::Read,
            });
        }

        self.nfts.push(nft);
        self.invalidate_roots();
        Ok(())
    }

    /// Embed an access token delegation.
    pub fn add_access_token(&mut self, token: AccessToken) {
        self.access_tokens.push(token);
        self.invalidate_roots();
    }

    /// Append signatures. Duplicates by `(signer_id, signature)` are
    /// dropped. The document root is invalidated; the signing root is not,
    /// since signatures live outside the signing tree.
    pub fn append_signatures(&mut self, sigs: impl IntoIterator<Item = DocumentSignature>) {
        let mut changed = false;
        for sig in sigs {
            changed |= self.signature_data.append(sig);
        }
        if changed {
            self.document_root = None;
        }
    }

    /// Record the author and time of the update.
    pub fn add_update_log(&mut self, author: Did) {
        self.author = Some(author);
        self.timestamp = Some(unix_now());
        self.invalidate_roots();
    }

    /// Set the data root computed by the typed body.
    pub fn set_data_root(&mut self, root: [u8; 32]) {
        self.data_root = Some(root);
        self.invalidate_roots();
    }

    fn invalidate_roots(&mut self) {
        self.signing_root = None;
        self.document_root = None;
    }

    // -----------------------------------------------------------------------
    // Collaborators
    // -----------------------------------------------------------------------

    /// Collaborators reachable via READ or READ_SIGN rules, minus `filter`.
    pub fn collaborators(&self, filter: &[Did]) -> Vec<Did> {
        self.collaborators_with(&[ReadAction::Read, ReadAction::ReadSign], filter)
    }

    /// Collaborators reachable via READ_SIGN rules, minus `filter`.
    pub fn signer_collaborators(&self, filter: &[Did]) -> Vec<Did> {
        self.collaborators_with(&[ReadAction::ReadSign], filter)
    }

    fn collaborators_with(&self, actions: &[ReadAction], filter: &[Did]) -> Vec<Did> {
        let mut out = Vec::new();
        for rule in self.read_rules.iter().filter(|r| actions.contains(&r.action)) {
            for key in &rule.roles {
                let Some(role) = self.role(key) else { continue };
                for c in &role.collaborators {
                    if !filter.contains(c) && !out.contains(c) {
                        out.push(*c);
                    }
                }
            }
        }
        out
    }

    /// Returns `true` if `account` is reachable via any read rule.
    pub fn account_can_read(&self, account: &Did) -> bool {
        self.collaborators(&[]).contains(account)
    }

    /// Look up a role by key.
    pub fn role(&self, key: &RoleKey) -> Option<&Role> {
        self.roles.iter().find(|r| r.key == *key)
    }

    /// Role keys whose role contains `account` as a collaborator.
    pub fn roles_of(&self, account: &Did) -> Vec<RoleKey> {
        self.roles
            .iter()
            .filter(|r| r.collaborators.contains(account))
            .map(|r| r.key)
            .collect()
    }

    /// Find an embedded access token by identifier.
    pub fn find_access_token(&self, identifier: &[u8; 32]) -> Option<&AccessToken> {
        self.access_tokens.iter().find(|t| t.identifier == *identifier)
    }

    /// Returns `true` if the NFT is bound to this document with read access
    /// granted through some role.
    pub fn nft_grants_read(&self, registry: Did, token_id: &[u8]) -> bool {
        let Ok(nft) = Nft::new(registry, token_id) else {
            return false;
        };
        let entry = nft.role_entry();
        self.read_rules.iter().any(|rule| {
            rule.roles.iter().any(|key| {
                self.role(key)
                    .map(|role| role.nfts.iter().any(|e| e == &entry))
                    .unwrap_or(false)
            })
        })
    }

    // -----------------------------------------------------------------------
    // Roots
    // -----------------------------------------------------------------------

    pub fn data_root(&self) -> Option<[u8; 32]> {
        self.data_root
    }

    pub fn signing_root(&self) -> Option<[u8; 32]> {
        self.signing_root
    }

    pub fn document_root(&self) -> Option<[u8; 32]> {
        self.document_root
    }

    /// Compute and cache the signing root: the root of the two-leaf tree
    /// over `(data_root, cd_root)`.
    pub fn calculate_signing_root(&mut self, doc_type: &str) -> DocumentResult<[u8; 32]> {
        let tree = self.signing_tree(doc_type)?;
        let root = tree.root_hash()?;
        self.signing_root = Some(root);
        Ok(root)
    }

    /// Compute and cache the document root: the root of the two-leaf tree
    /// over `(signing_root, signatures_root)`.
    pub fn calculate_document_root(&mut self) -> DocumentResult<[u8; 32]> {
        let tree = self.document_root_tree()?;
        let root = tree.root_hash()?;
        self.document_root = Some(root);
        Ok(root)
    }

    /// The signatures-tree root.
    pub fn signatures_root_hash(&mut self) -> DocumentResult<[u8; 32]> {
        Ok(self.signature_tree()?.root_hash()?)
    }

    /// The sibling hashes that extend a signing-root proof to the document
    /// root, as submitted with an anchor commit.
    pub fn signing_root_proof_hashes(&mut self) -> DocumentResult<Vec<[u8; 32]>> {
        Ok(vec![self.signatures_root_hash()?])
    }

    // -----------------------------------------------------------------------
    // Trees
    // -----------------------------------------------------------------------

    /// The canonical value the envelope (`cd_tree`) is built over.
    ///
    /// Cached roots, salts, and signature data are excluded: roots derive
    /// from this tree, and signatures commit through their own subtree.
    pub fn cd_leaf_value(&self) -> serde_json::Value {
        json!({
            "document_id": self.document_id.to_hex(),
            "current_version": self.current_version.to_hex(),
            "current_preimage": hex::encode(self.current_preimage.as_bytes()),
            "next_version": self.next_version.to_hex(),
            "next_preimage": hex::encode(self.next_preimage.as_bytes()),
            "previous_version": self.previous_version.map(|v| v.to_hex()),
            "previous_root": self.previous_root.map(hex::encode),
            "author": self.author.map(|a| a.to_hex()),
            "timestamp": self.timestamp,
            "roles": self.roles.iter().map(|r| json!({
                "key": hex::encode(r.key.as_bytes()),
                "collaborators": r.collaborators.iter().map(|c| c.to_hex()).collect::<Vec<_>>(),
                "nfts": r.nfts.iter().map(hex::encode).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
            "read_rules": self.read_rules.iter().map(|r| json!({
                "roles": r.roles.iter().map(|k| hex::encode(k.as_bytes())).collect::<Vec<_>>(),
                "action": format!("{:?}", r.action),
            })).collect::<Vec<_>>(),
            "transition_rules": self.transition_rules.iter().map(|r| json!({
                "roles": r.roles.iter().map(|k| hex::encode(k.as_bytes())).collect::<Vec<_>>(),
                "match_type": format!("{:?}", r.match_type),
                "field": hex::encode(&r.field),
                "action": format!("{:?}", r.action),
            })).collect::<Vec<_>>(),
            "nfts": self.nfts.iter().map(|n| json!({
                "registry_id": hex::encode(n.registry_id),
                "token_id": hex::encode(n.token_id),
            })).collect::<Vec<_>>(),
            "access_tokens": self.access_tokens.iter().map(|t| json!({
                "identifier": hex::encode(t.identifier),
                "granter": t.granter.to_hex(),
                "grantee": t.grantee.to_hex(),
                "role_identifier": hex::encode(t.role_identifier.as_bytes()),
                "key_identifier": hex::encode(&t.key_identifier),
                "document_identifier": t.document_identifier.to_hex(),
                "signature": hex::encode(&t.signature),
            })).collect::<Vec<_>>(),
        })
    }

    fn ensure_envelope_salts(&mut self) -> &[Salt] {
        let needed = traverse::count_leaves(&self.cd_leaf_value());
        let stale = self
            .envelope_salts
            .as_ref()
            .map(|s| s.len() != needed)
            .unwrap_or(true);
        if stale {
            self.envelope_salts = Some(Salt::batch(needed));
        }
        self.envelope_salts.as_deref().expect("salts just set")
    }

    fn ensure_signature_salts(&mut self) -> &[Salt] {
        let needed = traverse::count_leaves(&self.signature_data.leaf_value());
        let stale = self
            .signature_salts
            .as_ref()
            .map(|s| s.len() != needed)
            .unwrap_or(true);
        if stale {
            self.signature_salts = Some(Salt::batch(needed));
        }
        self.signature_salts.as_deref().expect("salts just set")
    }

    /// The envelope tree (`cd_tree`), including the explicit document-type
    /// leaf with a zero salt.
    pub fn envelope_tree(&mut self, doc_type: &str) -> DocumentResult<DocumentTree> {
        let value = self.cd_leaf_value();
        let salts = self.ensure_envelope_salts().to_vec();

        let mut tree = DocumentTree::with_prefix(prefix_property(CD_TREE_PREFIX));
        tree.add_value_leaves(&value, &salts)?;
        tree.add_leaf(LeafNode::new(
            field_property(CD_TREE_PREFIX, DOCUMENT_TYPE_FIELD),
            doc_type.as_bytes().to_vec(),
            Salt::zero(),
        ))?;
        tree.generate()?;
        Ok(tree)
    }

    /// The signature-data tree (`signatures_tree`).
    pub fn signature_tree(&mut self) -> DocumentResult<DocumentTree> {
        let value = self.signature_data.leaf_value();
        let salts = self.ensure_signature_salts().to_vec();

        let mut tree = DocumentTree::with_prefix(prefix_property(SIGNATURES_TREE_PREFIX));
        tree.add_value_leaves(&value, &salts)?;
        tree.generate()?;
        Ok(tree)
    }

    /// The signing tree: two pre-hashed leaves, data root and coredoc root.
    pub fn signing_tree(&mut self, doc_type: &str) -> DocumentResult<DocumentTree> {
        let data_root = self.data_root.ok_or(DocumentError::MissingDataRoot)?;
        let cd_root = self.envelope_tree(doc_type)?.root_hash()?;

        let mut tree = DocumentTree::with_prefix(prefix_property(SIGNING_TREE_PREFIX));
        tree.add_hashed_leaf(field_property(SIGNING_TREE_PREFIX, DATA_ROOT_FIELD), data_root)?;
        tree.add_hashed_leaf(field_property(SIGNING_TREE_PREFIX, CD_ROOT_FIELD), cd_root)?;
        tree.generate()?;
        Ok(tree)
    }

    /// The document-root tree: two pre-hashed leaves, signing root and
    /// signatures root.
    pub fn document_root_tree(&mut self) -> DocumentResult<DocumentTree> {
        let signing_root = self.signing_root.ok_or(DocumentError::MissingSigningRoot)?;
        let signatures_root = self.signatures_root_hash()?;

        let mut tree = DocumentTree::with_prefix(prefix_property(DR_TREE_PREFIX));
        tree.add_hashed_leaf(
            field_property(DR_TREE_PREFIX, SIGNING_ROOT_FIELD),
            signing_root,
        )?;
        tree.add_hashed_leaf(
            field_property(DR_TREE_PREFIX, SIGNATURES_ROOT_FIELD),
            signatures_root,
        )?;
        tree.generate()?;
        Ok(tree)
    }

    // -----------------------------------------------------------------------
    // Proofs
    // -----------------------------------------------------------------------

    /// Create proofs for `fields`, each extended with the cross-tree sibling
    /// hashes so it verifies against the document root.
    ///
    /// Fields are routed by their leading prefix: the data tree's own
    /// prefix, `cd_tree`, `signatures_tree`, or `dr_tree`. Anything else is
    /// an [`DocumentError::UnknownTreePrefix`].
    pub fn create_proofs(
        &mut self,
        doc_type: &str,
        data_tree: &DocumentTree,
        fields: &[&str],
    ) -> DocumentResult<Vec<Proof>> {
        let dr_tree = self.document_root_tree()?;
        let signature_tree = self.signature_tree()?;
        let cd_tree = self.envelope_tree(doc_type)?;

        let signing_root = self.signing_root.ok_or(DocumentError::MissingSigningRoot)?;
        let data_root = data_tree.root_hash()?;
        let cd_root = cd_tree.root_hash()?;
        let signatures_root = signature_tree.root_hash()?;

        let data_prefix = data_tree
            .prefix()
            .map(|p| p.readable().to_string())
            .unwrap_or_default();

        let mut proofs = Vec::with_capacity(fields.len());
        for field in fields {
            let prefix = field.split('.').next().unwrap_or(field);
            let (tree, appends): (&DocumentTree, Vec<[u8; 32]>) = match prefix {
                DR_TREE_PREFIX => (&dr_tree, vec![]),
                CD_TREE_PREFIX => (&cd_tree, vec![data_root, signatures_root]),
                SIGNATURES_TREE_PREFIX => (&signature_tree, vec![signing_root]),
                p if !data_prefix.is_empty() && p == data_prefix => {
                    (data_tree, vec![cd_root, signatures_root])
                }
                other => return Err(DocumentError::UnknownTreePrefix(other.to_string())),
            };

            let mut proof = tree.create_proof(field)?;
            proof.append_hashes(appends);
            proofs.push(proof);
        }

        Ok(proofs)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

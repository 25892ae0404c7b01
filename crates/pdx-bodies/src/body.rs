use pdx_document::CoreDocument;
use pdx_tree::{traverse, DocumentTree, Proof, Property};
use pdx_types::{Did, Salt};

use crate::error::{BodyError, BodyResult};
use crate::invoice::Invoice;
use crate::purchase_order::PurchaseOrder;

/// Type URL of the invoice body.
pub const INVOICE_TYPE_URL: &str = "pdx.io/documents/invoice";
/// Type URL of the purchase-order body.
pub const PURCHASE_ORDER_TYPE_URL: &str = "pdx.io/documents/purchase_order";

/// Storage tag byte for invoices.
pub const INVOICE_TAG: u8 = 0x01;
/// Storage tag byte for purchase orders.
pub const PURCHASE_ORDER_TAG: u8 = 0x02;

// Body tree prefixes use the second byte of a 4-byte compact slice by
// convention; envelope tree prefixes use the first.
const INVOICE_COMPACT_PREFIX: &[u8] = &[0, 1, 0, 0];
const PURCHASE_ORDER_COMPACT_PREFIX: &[u8] = &[0, 2, 0, 0];

/// A typed document body, dispatched by variant.
///
/// The variant tag is the only type information the core ever consults —
/// there is no downcasting. Every capability (packing, data root, new
/// versions, proofs, NFTs) is a method here, delegating envelope work to
/// the embedded [`CoreDocument`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Body {
    Invoice(Invoice),
    PurchaseOrder(PurchaseOrder),
}

impl Body {
    /// The body's type URL, committed under `cd_tree.document_type`.
    pub fn type_url(&self) -> &'static str {
        match self {
            Self::Invoice(_) => INVOICE_TYPE_URL,
            Self::PurchaseOrder(_) => PURCHASE_ORDER_TYPE_URL,
        }
    }

    /// The type-registry prefix byte used in the persisted keyspace.
    pub fn storage_tag(&self) -> u8 {
        match self {
            Self::Invoice(_) => INVOICE_TAG,
            Self::PurchaseOrder(_) => PURCHASE_ORDER_TAG,
        }
    }

    /// The readable data-tree prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Invoice(_) => "invoice",
            Self::PurchaseOrder(_) => "purchase_order",
        }
    }

    /// The compact data-tree prefix.
    pub fn compact_prefix(&self) -> &'static [u8] {
        match self {
            Self::Invoice(_) => INVOICE_COMPACT_PREFIX,
            Self::PurchaseOrder(_) => PURCHASE_ORDER_COMPACT_PREFIX,
        }
    }

    /// The embedded envelope.
    pub fn core(&self) -> &CoreDocument {
        match self {
            Self::Invoice(b) => &b.core,
            Self::PurchaseOrder(b) => &b.core,
        }
    }

    /// The embedded envelope, mutable.
    pub fn core_mut(&mut self) -> &mut CoreDocument {
        match self {
            Self::Invoice(b) => &mut b.core,
            Self::PurchaseOrder(b) => &mut b.core,
        }
    }

    /// The canonical value the data tree is built over.
    pub fn data_value(&self) -> serde_json::Value {
        match self {
            Self::Invoice(b) => b.data_value(),
            Self::PurchaseOrder(b) => b.data_value(),
        }
    }

    // -----------------------------------------------------------------------
    // Wire / storage encoding
    // -----------------------------------------------------------------------

    /// Pack the body for the wire or storage: the type-registry tag byte
    /// followed by the serialised body (envelope and salts included).
    pub fn to_bytes(&self) -> BodyResult<Vec<u8>> {
        let payload = match self {
            Self::Invoice(b) => bincode::serialize(b),
            Self::PurchaseOrder(b) => bincode::serialize(b),
        }
        .map_err(|e| BodyError::Encode(e.to_string()))?;

        let mut out = Vec::with_capacity(1 + payload.len());
        out.push(self.storage_tag());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Unpack a body from its tagged encoding.
    pub fn from_bytes(bytes: &[u8]) -> BodyResult<Self> {
        let (tag, payload) = bytes
            .split_first()
            .ok_or_else(|| BodyError::Decode("empty payload".into()))?;
        match *tag {
            INVOICE_TAG => bincode::deserialize(payload)
                .map(Self::Invoice)
                .map_err(|e| BodyError::Decode(e.to_string())),
            PURCHASE_ORDER_TAG => bincode::deserialize(payload)
                .map(Self::PurchaseOrder)
                .map_err(|e| BodyError::Decode(e.to_string())),
            other => Err(BodyError::UnknownTypeTag(other)),
        }
    }

    // -----------------------------------------------------------------------
    // Salts and trees
    // -----------------------------------------------------------------------

    fn data_salts(&self) -> &Option<Vec<Salt>> {
        match self {
            Self::Invoice(b) => &b.data_salts,
            Self::PurchaseOrder(b) => &b.data_salts,
        }
    }

    fn set_data_salts(&mut self, salts: Vec<Salt>) {
        match self {
            Self::Invoice(b) => b.data_salts = Some(salts),
            Self::PurchaseOrder(b) => b.data_salts = Some(salts),
        }
    }

    /// Body salts are generated on first use and persisted with the body.
    fn ensure_data_salts(&mut self) -> Vec<Salt> {
        let needed = traverse::count_leaves(&self.data_value());
        let stale = self
            .data_salts()
            .as_ref()
            .map(|s| s.len() != needed)
            .unwrap_or(true);
        if stale {
            self.set_data_salts(Salt::batch(needed));
        }
        self.data_salts().clone().expect("salts just set")
    }

    /// The salted merkle tree over the body fields.
    pub fn data_tree(&mut self) -> BodyResult<DocumentTree> {
        let value = self.data_value();
        let salts = self.ensure_data_salts();
        let mut tree = DocumentTree::with_prefix(Property::new(
            self.prefix(),
            self.compact_prefix().to_vec(),
        ));
        tree.add_value_leaves(&value, &salts)?;
        tree.generate()?;
        Ok(tree)
    }

    /// Compute the data root and store it on the envelope.
    pub fn calculate_data_root(&mut self) -> BodyResult<[u8; 32]> {
        let root = self.data_tree()?.root_hash()?;
        self.core_mut().set_data_root(root);
        Ok(root)
    }

    /// Compute and cache the signing root.
    pub fn calculate_signing_root(&mut self) -> BodyResult<[u8; 32]> {
        let doc_type = self.type_url();
        Ok(self.core_mut().calculate_signing_root(doc_type)?)
    }

    /// Compute and cache the document root.
    pub fn calculate_document_root(&mut self) -> BodyResult<[u8; 32]> {
        Ok(self.core_mut().calculate_document_root()?)
    }

    // -----------------------------------------------------------------------
    // Versioning
    // -----------------------------------------------------------------------

    /// Derive the next version, carrying the field data forward. The caller
    /// edits fields before the new version's signing root is calculated.
    pub fn prepare_new_version(&self, collaborators: Vec<Did>) -> BodyResult<Body> {
        let prefix = self.compact_prefix();
        match self {
            Self::Invoice(b) => {
                let core = b.core.prepare_new_version(collaborators, true, prefix)?;
                Ok(Self::Invoice(Invoice {
                    data: b.data.clone(),
                    core,
                    data_salts: b.data_salts.clone(),
                }))
            }
            Self::PurchaseOrder(b) => {
                let core = b.core.prepare_new_version(collaborators, true, prefix)?;
                Ok(Self::PurchaseOrder(PurchaseOrder {
                    data: b.data.clone(),
                    core,
                    data_salts: b.data_salts.clone(),
                }))
            }
        }
    }

    // -----------------------------------------------------------------------
    // NFTs and proofs
    // -----------------------------------------------------------------------

    /// Bind an NFT to the document, optionally granting read access.
    pub fn add_nft(
        &mut self,
        grant_read_access: bool,
        registry: Did,
        token_id: &[u8],
    ) -> BodyResult<()> {
        Ok(self.core_mut().add_nft(grant_read_access, registry, token_id)?)
    }

    /// Create proofs for `fields`, verified against the document root.
    pub fn create_proofs(&mut self, fields: &[&str]) -> BodyResult<Vec<Proof>> {
        let tree = self.data_tree()?;
        let doc_type = self.type_url();
        Ok(self.core_mut().create_proofs(doc_type, &tree, fields)?)
    }

    /// Create the proofs an NFT mint needs: the next version and document
    /// type, plus (optionally) the NFT binding itself and the read-access
    /// rule that covers it.
    pub fn create_nft_proofs(
        &mut self,
        registry: Did,
        token_id: &[u8],
        nft_unique_proof: bool,
        read_access_proof: bool,
    ) -> BodyResult<Vec<Proof>> {
        let mut fields: Vec<String> = vec![
            "cd_tree.next_version".into(),
            "cd_tree.document_type".into(),
        ];

        let core = self.core();
        let nft = core
            .nfts
            .iter()
            .position(|n| {
                n.registry() == registry && token_id == n.token_id.as_slice()
            })
            .ok_or(BodyError::NftNotFound)?;

        if nft_unique_proof {
            fields.push(format!("cd_tree.nfts[{nft}].registry_id"));
            fields.push(format!("cd_tree.nfts[{nft}].token_id"));
        }

        if read_access_proof {
            let entry = core.nfts[nft].role_entry();
            let (role_idx, entry_idx) = core
                .roles
                .iter()
                .enumerate()
                .find_map(|(i, role)| {
                    role.nfts.iter().position(|e| e == &entry).map(|j| (i, j))
                })
                .ok_or(BodyError::NftNotFound)?;
            let role_key = core.roles[role_idx].key;
            let rule_idx = core
                .read_rules
                .iter()
                .position(|r| r.roles.contains(&role_key))
                .ok_or(BodyError::NftNotFound)?;

            fields.push(format!("cd_tree.roles[{role_idx}].nfts[{entry_idx}]"));
            fields.push(format!("cd_tree.read_rules[{rule_idx}].action"));
        }

        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        self.create_proofs(&refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::InvoiceData;
    use crate::purchase_order::PurchaseOrderData;

    fn invoice() -> Body {
        Body::Invoice(Invoice::new(
            InvoiceData {
                invoice_number: "INV-2024-001".into(),
                currency: "EUR".into(),
                gross_amount: 1190,
                net_amount: 1000,
                tax_amount: 190,
                tax_rate: 19,
                ..Default::default()
            },
            vec![Did::random()],
        ))
    }

    fn rooted(mut body: Body) -> Body {
        body.calculate_data_root().unwrap();
        body.calculate_signing_root().unwrap();
        body.calculate_document_root().unwrap();
        body
    }

    #[test]
    fn wire_roundtrip_preserves_roots() {
        let body = rooted(invoice());
        let root = body.core().document_root().unwrap();

        let bytes = body.to_bytes().unwrap();
        assert_eq!(bytes[0], INVOICE_TAG);

        let mut parsed = Body::from_bytes(&bytes).unwrap();
        parsed.calculate_data_root().unwrap();
        parsed.calculate_signing_root().unwrap();
        assert_eq!(parsed.calculate_document_root().unwrap(), root);
    }

    #[test]
    fn purchase_order_tag_differs() {
        let po = Body::PurchaseOrder(PurchaseOrder::new(
            PurchaseOrderData::default(),
            vec![Did::random()],
        ));
        let bytes = po.to_bytes().unwrap();
        assert_eq!(bytes[0], PURCHASE_ORDER_TAG);
        assert!(matches!(Body::from_bytes(&bytes).unwrap(), Body::PurchaseOrder(_)));
    }

    #[test]
    fn unknown_tag_rejected() {
        let err = Body::from_bytes(&[0x7f, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, BodyError::UnknownTypeTag(0x7f)));
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(
            Body::from_bytes(&[]).unwrap_err(),
            BodyError::Decode(_)
        ));
    }

    #[test]
    fn data_root_is_stable_once_salted() {
        let mut body = invoice();
        let first = body.calculate_data_root().unwrap();
        let second = body.calculate_data_root().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn data_root_changes_with_fields() {
        let mut body = invoice();
        let before = body.calculate_data_root().unwrap();
        if let Body::Invoice(inv) = &mut body {
            inv.data.net_amount = 2000;
        }
        let after = body.calculate_data_root().unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn prepare_new_version_carries_data() {
        let body = rooted(invoice());
        let next = body.prepare_new_version(vec![]).unwrap();
        assert_eq!(next.data_value(), body.data_value());
        assert_eq!(next.core().previous_root, body.core().document_root());
        assert_eq!(next.type_url(), INVOICE_TYPE_URL);
    }

    #[test]
    fn body_field_proof_reaches_document_root() {
        let mut body = rooted(invoice());
        let root = body.core().document_root().unwrap();
        let proofs = body.create_proofs(&["invoice.gross_amount"]).unwrap();
        assert!(proofs[0].verify(&root));
    }

    #[test]
    fn nft_proofs_verify() {
        let mut body = invoice();
        let registry = Did::random();
        let token = [9u8; 32];
        body.add_nft(true, registry, &token).unwrap();
        let body = rooted(body);
        let root = body.core().document_root().unwrap();

        let mut body = body;
        let proofs = body.create_nft_proofs(registry, &token, true, true).unwrap();
        assert_eq!(proofs.len(), 6);
        for proof in &proofs {
            assert!(proof.verify(&root), "proof for {} failed", proof.property);
        }
    }

    #[test]
    fn nft_proofs_require_binding() {
        let mut body = rooted(invoice());
        let err = body
            .create_nft_proofs(Did::random(), &[1u8; 32], true, false)
            .unwrap_err();
        assert!(matches!(err, BodyError::NftNotFound));
    }
}

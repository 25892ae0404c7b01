use serde::{Deserialize, Serialize};
use serde_json::json;

use pdx_document::CoreDocument;
use pdx_types::{Did, Salt};

/// Purchase-order field set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderData {
    pub po_status: String,
    pub po_number: String,
    pub order_name: String,
    pub order_street: String,
    pub order_city: String,
    pub order_zipcode: String,
    pub order_country: String,
    pub recipient_name: String,
    pub recipient_street: String,
    pub recipient_city: String,
    pub recipient_zipcode: String,
    pub recipient_country: String,
    pub currency: String,
    pub order_amount: i64,
    pub net_amount: i64,
    pub tax_amount: i64,
    pub tax_rate: i64,
    pub recipient: Option<Did>,
    pub order_contact: String,
    pub comment: String,
    pub delivery_date: Option<u64>,
    pub date_created: Option<u64>,
    pub extra_data: Vec<u8>,
}

/// A purchase-order document: the typed field set plus its embedded envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub data: PurchaseOrderData,
    pub core: CoreDocument,
    pub(crate) data_salts: Option<Vec<Salt>>,
}

impl PurchaseOrder {
    /// Create a new purchase order as version zero of a fresh lineage.
    pub fn new(data: PurchaseOrderData, collaborators: Vec<Did>) -> Self {
        Self {
            data,
            core: CoreDocument::new(collaborators),
            data_salts: None,
        }
    }

    /// The canonical value the data tree is built over.
    pub fn data_value(&self) -> serde_json::Value {
        let d = &self.data;
        json!({
            "po_status": d.po_status,
            "po_number": d.po_number,
            "order_name": d.order_name,
            "order_street": d.order_street,
            "order_city": d.order_city,
            "order_zipcode": d.order_zipcode,
            "order_country": d.order_country,
            "recipient_name": d.recipient_name,
            "recipient_street": d.recipient_street,
            "recipient_city": d.recipient_city,
            "recipient_zipcode": d.recipient_zipcode,
            "recipient_country": d.recipient_country,
            "currency": d.currency,
            "order_amount": d.order_amount,
            "net_amount": d.net_amount,
            "tax_amount": d.tax_amount,
            "tax_rate": d.tax_rate,
            "recipient": d.recipient.map(|v| v.to_hex()),
            "order_contact": d.order_contact,
            "comment": d.comment,
            "delivery_date": d.delivery_date,
            "date_created": d.date_created,
            "extra_data": hex::encode(&d.extra_data),
        })
    }
}

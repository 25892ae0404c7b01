use serde::{Deserialize, Serialize};
use serde_json::json;

use pdx_document::CoreDocument;
use pdx_types::{Did, Salt};

/// Invoice field set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceData {
    pub invoice_number: String,
    pub invoice_status: String,
    pub sender_name: String,
    pub sender_street: String,
    pub sender_city: String,
    pub sender_zipcode: String,
    pub sender_country: String,
    pub recipient_name: String,
    pub recipient_street: String,
    pub recipient_city: String,
    pub recipient_zipcode: String,
    pub recipient_country: String,
    pub currency: String,
    pub gross_amount: i64,
    pub net_amount: i64,
    pub tax_amount: i64,
    pub tax_rate: i64,
    pub sender: Option<Did>,
    pub recipient: Option<Did>,
    pub payee: Option<Did>,
    pub due_date: Option<u64>,
    pub date_created: Option<u64>,
    pub comment: String,
    pub extra_data: Vec<u8>,
}

/// An invoice document: the typed field set plus its embedded envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub data: InvoiceData,
    pub core: CoreDocument,
    pub(crate) data_salts: Option<Vec<Salt>>,
}

impl Invoice {
    /// Create a new invoice as version zero of a fresh lineage.
    pub fn new(data: InvoiceData, collaborators: Vec<Did>) -> Self {
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
            "invoice_number": d.invoice_number,
            "invoice_status": d.invoice_status,
            "sender_name": d.sender_name,
            "sender_street": d.sender_street,
            "sender_city": d.sender_city,
            "sender_zipcode": d.sender_zipcode,
            "sender_country": d.sender_country,
            "recipient_name": d.recipient_name,
            "recipient_street": d.recipient_street,
            "recipient_city": d.recipient_city,
            "recipient_zipcode": d.recipient_zipcode,
            "recipient_country": d.recipient_country,
            "currency": d.currency,
            "gross_amount": d.gross_amount,
            "net_amount": d.net_amount,
            "tax_amount": d.tax_amount,
            "tax_rate": d.tax_rate,
            "sender": d.sender.map(|v| v.to_hex()),
            "recipient": d.recipient.map(|v| v.to_hex()),
            "payee": d.payee.map(|v| v.to_hex()),
            "due_date": d.due_date,
            "date_created": d.date_created,
            "comment": d.comment,
            "extra_data": hex::encode(&d.extra_data),
        })
    }
}

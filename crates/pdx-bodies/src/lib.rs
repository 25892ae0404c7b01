//! Typed document bodies.
//!
//! A [`Body`] is a tagged variant over the supported document types —
//! invoice and purchase order — each owning its field set and embedding a
//! [`pdx_document::CoreDocument`]. The variant tag doubles as the
//! type-registry prefix byte in the persisted keyspace, and the type URL is
//! what the envelope commits under `cd_tree.document_type`.

pub mod body;
pub mod error;
pub mod invoice;
pub mod purchase_order;

pub use body::{
    Body, INVOICE_TAG, INVOICE_TYPE_URL, PURCHASE_ORDER_TAG, PURCHASE_ORDER_TYPE_URL,
};
pub use error::{BodyError, BodyResult};
pub use invoice::{Invoice, InvoiceData};
pub use purchase_order::{PurchaseOrder, PurchaseOrderData};

//! Peer wire protocol for PDX.
//!
//! Messages travel as framed [`Envelope`]s — a header naming the sender,
//! network, type, and timestamp, plus a bincode body. The message set is
//! `RequestSignature`, `SendAnchored`, and `GetDocument`, each with a
//! paired reply, and an `Error` message for validation failures crossing
//! the peer boundary.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::EnvelopeCodec;
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    AccessRequest, AnchorDocumentRequest, AnchorDocumentResponse, Envelope, ErrorBody,
    GetDocumentRequest, GetDocumentResponse, Header, MessageType, SignatureRequest,
    SignatureResponse, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

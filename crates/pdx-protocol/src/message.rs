use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use pdx_document::DocumentSignature;
use pdx_types::{Did, DocumentId};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// All message types in the PDX peer protocol. Every request type has a
/// paired `*Rep` reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    RequestSignature,
    RequestSignatureRep,
    SendAnchored,
    SendAnchoredRep,
    GetDocument,
    GetDocumentRep,
    Error,
}

impl MessageType {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::RequestSignature => 1,
            Self::RequestSignatureRep => 2,
            Self::SendAnchored => 3,
            Self::SendAnchoredRep => 4,
            Self::GetDocument => 5,
            Self::GetDocumentRep => 6,
            Self::Error => 255,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::RequestSignature),
            2 => Some(Self::RequestSignatureRep),
            3 => Some(Self::SendAnchored),
            4 => Some(Self::SendAnchoredRep),
            5 => Some(Self::GetDocument),
            6 => Some(Self::GetDocumentRep),
            255 => Some(Self::Error),
            _ => None,
        }
    }

    /// The paired reply type, for request types.
    pub fn reply_type(&self) -> Option<Self> {
        match self {
            Self::RequestSignature => Some(Self::RequestSignatureRep),
            Self::SendAnchored => Some(Self::SendAnchoredRep),
            Self::GetDocument => Some(Self::GetDocumentRep),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RequestSignature => "RequestSignature",
            Self::RequestSignatureRep => "RequestSignatureRep",
            Self::SendAnchored => "SendAnchored",
            Self::SendAnchoredRep => "SendAnchoredRep",
            Self::GetDocument => "GetDocument",
            Self::GetDocumentRep => "GetDocumentRep",
            Self::Error => "Error",
        }
    }
}

/// Envelope header carried with every message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub sender_id: Did,
    pub network_id: u32,
    pub message_type: MessageType,
    /// Unix seconds at send time.
    pub timestamp: u64,
}

/// A framed peer message: header plus an encoded body payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: Header,
    pub body: Vec<u8>,
}

impl Envelope {
    pub fn new(sender_id: Did, network_id: u32, message_type: MessageType, body: Vec<u8>) -> Self {
        Self {
            header: Header {
                sender_id,
                network_id,
                message_type,
                timestamp: unix_now(),
            },
            body,
        }
    }
}

/// How a `GetDocument` requester claims read access.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRequest {
    Requester,
    NftOwner {
        registry: Did,
        token_id: Vec<u8>,
    },
    AccessToken {
        delegating_document_id: DocumentId,
        token_identifier: [u8; 32],
    },
}

/// Body of `RequestSignature`: the packed document awaiting the receiver's
/// signature over its signing root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub document: Vec<u8>,
}

/// Body of `RequestSignatureRep`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResponse {
    pub signature: DocumentSignature,
}

/// Body of `SendAnchored`: the packed, anchored document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorDocumentRequest {
    pub document: Vec<u8>,
}

/// Body of `SendAnchoredRep`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorDocumentResponse {
    pub accepted: bool,
}

/// Body of `GetDocument`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetDocumentRequest {
    pub document_id: DocumentId,
    pub access: AccessRequest,
}

/// Body of `GetDocumentRep`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetDocumentResponse {
    pub document: Vec<u8>,
}

/// Body of `Error`. Validation failures crossing the peer boundary are
/// marshalled into this; the channel stays open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u32,
    pub message: String,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_unique() {
        let types = [
            MessageType::RequestSignature,
            MessageType::RequestSignatureRep,
            MessageType::SendAnchored,
            MessageType::SendAnchoredRep,
            MessageType::GetDocument,
            MessageType::GetDocumentRep,
            MessageType::Error,
        ];
        let mut tags: Vec<u8> = types.iter().map(MessageType::type_tag).collect();
        let len = tags.len();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), len, "type tags should be unique");
    }

    #[test]
    fn tag_roundtrip() {
        for tag in [1u8, 2, 3, 4, 5, 6, 255] {
            let mt = MessageType::from_tag(tag).unwrap();
            assert_eq!(mt.type_tag(), tag);
        }
        assert!(MessageType::from_tag(99).is_none());
    }

    #[test]
    fn request_types_have_replies() {
        assert_eq!(
            MessageType::RequestSignature.reply_type(),
            Some(MessageType::RequestSignatureRep)
        );
        assert_eq!(
            MessageType::SendAnchored.reply_type(),
            Some(MessageType::SendAnchoredRep)
        );
        assert_eq!(
            MessageType::GetDocument.reply_type(),
            Some(MessageType::GetDocumentRep)
        );
        assert!(MessageType::Error.reply_type().is_none());
        assert!(MessageType::SendAnchoredRep.reply_type().is_none());
    }

    #[test]
    fn envelope_carries_header() {
        let sender = Did::random();
        let env = Envelope::new(sender, 42, MessageType::GetDocument, vec![1, 2, 3]);
        assert_eq!(env.header.sender_id, sender);
        assert_eq!(env.header.network_id, 42);
        assert_eq!(env.header.message_type, MessageType::GetDocument);
        assert!(env.header.timestamp > 0);
    }
}

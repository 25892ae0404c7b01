use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Envelope, MessageType, MAX_MESSAGE_SIZE};

/// Codec for framed PDX envelopes.
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Encode an envelope with framing: `[4 bytes len][1 byte tag][payload]`.
    pub fn encode(envelope: &Envelope) -> ProtocolResult<Vec<u8>> {
        let payload = bincode::serialize(envelope)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(4 + 1 + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(envelope.header.message_type.type_tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a framed envelope. Returns `(envelope, bytes_consumed)`.
    pub fn decode(data: &[u8]) -> ProtocolResult<(Envelope, usize)> {
        if data.len() < 5 {
            return Err(ProtocolError::FramingError("too short".into()));
        }
        let len = u32::from_be_bytes(data[0..4].try_into().expect("4 bytes")) as usize;
        if len < 1 {
            return Err(ProtocolError::FramingError("zero-length frame".into()));
        }
        if len - 1 > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: len - 1,
                max: MAX_MESSAGE_SIZE,
            });
        }
        let total = 4 + len;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }

        let tag = data[4];
        let expected = MessageType::from_tag(tag).ok_or(ProtocolError::UnknownMessageType(tag))?;

        let payload = &data[5..total];
        let envelope: Envelope = bincode::deserialize(payload)
            .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;

        if envelope.header.message_type != expected {
            return Err(ProtocolError::FramingError(format!(
                "frame tag {} does not match header type {}",
                tag,
                envelope.header.message_type.type_name()
            )));
        }

        Ok((envelope, total))
    }

    /// Encode a message body for embedding in an envelope.
    pub fn encode_body<T: serde::Serialize>(body: &T) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(body).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Decode a message body from an envelope payload.
    pub fn decode_body<T: serde::de::DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
        bincode::deserialize(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

//! Payload codecs, one per payload kind.
//!
//! Message layout (send and receive share it), big-endian:
//! `sender_id u32 | recipient_id u32 | sent_at i64 (unix ms) | content_length u32 | content`.
//!
//! Ack layout: `recipient_id u32 | sent_at i64 (unix ms) | sender_id u32`.

use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime, Utc};

use super::frame::{PROTOCOL_VERSION, PayloadKind, encode_frame};
use crate::common::{Message, MessageAck, ProtocolError};

const MESSAGE_PREFIX_LEN: usize = 4 + 4 + 8 + 4;
const ACK_LEN: usize = 4 + 8 + 4;

pub fn encode_send(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let content = message.content.as_bytes();
    let content_length =
        u32::try_from(content.len()).map_err(|_| ProtocolError::PayloadTooLarge(content.len()))?;

    let mut buf = BytesMut::with_capacity(MESSAGE_PREFIX_LEN + content.len());
    buf.put_u32(message.sender_id);
    buf.put_u32(message.recipient_id);
    buf.put_i64(message.sent_at.timestamp_millis());
    buf.put_u32(content_length);
    buf.put_slice(content);
    Ok(buf.to_vec())
}

pub fn decode_receive(bytes: &[u8]) -> Result<Message, ProtocolError> {
    if bytes.len() < MESSAGE_PREFIX_LEN {
        return Err(ProtocolError::MalformedPayload(format!(
            "message payload of {} bytes is shorter than the {MESSAGE_PREFIX_LEN}-byte prefix",
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let sender_id = buf.get_u32();
    let recipient_id = buf.get_u32();
    let sent_at = millis_to_datetime(buf.get_i64())?;
    let content_length = buf.get_u32() as usize;

    if content_length != buf.remaining() {
        return Err(ProtocolError::MalformedPayload(format!(
            "declared content length {content_length} but {} bytes remain",
            buf.remaining()
        )));
    }

    let content = String::from_utf8(buf.to_vec())
        .map_err(|err| ProtocolError::MalformedPayload(format!("content is not UTF-8: {err}")))?;

    Ok(Message {
        sender_id,
        recipient_id,
        sent_at,
        content,
    })
}

#[cfg(test)]
pub fn encode_ack(ack: &MessageAck) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(ACK_LEN);
    buf.put_u32(ack.recipient_id);
    buf.put_i64(ack.sent_at.timestamp_millis());
    buf.put_u32(ack.sender_id);
    buf.to_vec()
}

pub fn decode_ack(bytes: &[u8]) -> Result<MessageAck, ProtocolError> {
    if bytes.len() != ACK_LEN {
        return Err(ProtocolError::MalformedPayload(format!(
            "ack payload must be {ACK_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let recipient_id = buf.get_u32();
    let sent_at = millis_to_datetime(buf.get_i64())?;
    let sender_id = buf.get_u32();

    Ok(MessageAck {
        recipient_id,
        sent_at,
        sender_id,
    })
}

/// Payload codec + frame codec for an outbound chat message.
pub fn encode_message_frame(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_send(message)?;
    encode_frame(PROTOCOL_VERSION, PayloadKind::MessageSend, &payload)
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, ProtocolError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| ProtocolError::MalformedPayload(format!("timestamp {millis} out of range")))
}

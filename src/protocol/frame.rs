//! Outer envelope shared by every message on the wire.
//!
//! Layout, big-endian:
//!
//! ```text
//! +---------+------+----------------+-----------------+
//! | version | kind | payload length | payload         |
//! | u8      | u8   | u32            | [u8; length]    |
//! +---------+------+----------------+-----------------+
//! ```
//!
//! The codec knows nothing about payload contents. Version policy is left to
//! the dispatcher; `decode_frame` only surfaces the raw value.

use bytes::{Buf, BufMut, BytesMut};

use crate::common::ProtocolError;

pub const PROTOCOL_VERSION: u8 = 1;

/// version (1) + kind (1) + payload length (4)
pub const HEADER_LEN: usize = 6;

/// Tag selecting which payload codec interprets a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    MessageSend,
    MessageReceive,
    MessageAck,
    Unknown(u8),
}

impl PayloadKind {
    pub fn tag(self) -> u8 {
        match self {
            PayloadKind::MessageSend => 1,
            PayloadKind::MessageReceive => 2,
            PayloadKind::MessageAck => 3,
            PayloadKind::Unknown(tag) => tag,
        }
    }
}

impl From<u8> for PayloadKind {
    fn from(tag: u8) -> Self {
        match tag {
            1 => PayloadKind::MessageSend,
            2 => PayloadKind::MessageReceive,
            3 => PayloadKind::MessageAck,
            other => PayloadKind::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub version: u8,
    pub payload_kind: PayloadKind,
    pub payload_length: u32,
    pub payload: Vec<u8>,
}

pub fn encode_frame(
    version: u8,
    payload_kind: PayloadKind,
    payload: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let payload_length =
        u32::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge(payload.len()))?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(version);
    buf.put_u8(payload_kind.tag());
    buf.put_u32(payload_length);
    buf.put_slice(payload);
    Ok(buf.to_vec())
}

/// Parses one frame from the start of `bytes`. Anything after the declared
/// payload is ignored.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::MalformedFrame(format!(
            "{} bytes is shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let version = buf.get_u8();
    let payload_kind = PayloadKind::from(buf.get_u8());
    let payload_length = buf.get_u32();

    if payload_length as usize > buf.remaining() {
        return Err(ProtocolError::MalformedFrame(format!(
            "declared payload length {payload_length} exceeds the {} bytes remaining",
            buf.remaining()
        )));
    }

    Ok(Frame {
        version,
        payload_kind,
        payload_length,
        payload: buf[..payload_length as usize].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_written_in_field_order() {
        let encoded = encode_frame(1, PayloadKind::MessageReceive, b"abc").unwrap();
        assert_eq!(encoded, vec![1, 2, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn decoded_length_matches_payload() {
        for payload in [Vec::new(), b"x".to_vec(), vec![0xFF; 4096]] {
            let encoded = encode_frame(PROTOCOL_VERSION, PayloadKind::MessageSend, &payload).unwrap();
            let frame = decode_frame(&encoded).unwrap();

            assert_eq!(frame.version, PROTOCOL_VERSION);
            assert_eq!(frame.payload_kind, PayloadKind::MessageSend);
            assert_eq!(frame.payload_length as usize, payload.len());
            assert_eq!(frame.payload, payload);
        }
    }

    #[test]
    fn short_header_is_rejected() {
        let err = decode_frame(&[1, 2, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame(_)));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let encoded = encode_frame(1, PayloadKind::MessageReceive, b"hello world").unwrap();
        for cut in HEADER_LEN..encoded.len() {
            let err = decode_frame(&encoded[..cut]).unwrap_err();
            assert!(matches!(err, ProtocolError::MalformedFrame(_)), "cut at {cut}");
        }
    }

    #[test]
    fn unknown_version_and_kind_are_surfaced_raw() {
        let frame = decode_frame(&[9, 200, 0, 0, 0, 0]).unwrap();
        assert_eq!(frame.version, 9);
        assert_eq!(frame.payload_kind, PayloadKind::Unknown(200));
        assert_eq!(frame.payload_kind.tag(), 200);
    }

    #[test]
    fn trailing_bytes_are_not_part_of_the_payload() {
        let mut encoded = encode_frame(1, PayloadKind::MessageAck, b"ok").unwrap();
        encoded.extend_from_slice(b"junk");
        let frame = decode_frame(&encoded).unwrap();
        assert_eq!(frame.payload, b"ok");
    }
}

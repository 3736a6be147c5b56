use thiserror::Error;

use super::types::ContactId;
use crate::network::session::SessionState;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported payload kind {0}")]
    UnsupportedPayloadKind(u8),

    #[error("payload of {0} bytes does not fit the length field")]
    PayloadTooLarge(usize),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("session is {0:?}, not open")]
    NotOpen(SessionState),

    #[error("transport error: {0}")]
    Io(String),

    #[error("closed by peer (code {code}): {reason}")]
    ClosedByPeer { code: u16, reason: String },
}

#[derive(Error, Debug)]
pub enum HistoryFetchError {
    #[error("history request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("history for contact {contact_id} returned HTTP {status}")]
    Status { contact_id: ContactId, status: u16 },
}

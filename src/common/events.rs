use super::error::ProtocolError;
use super::types::{Message, MessageAck};

/// Sự kiện từ tầng mạng gửi lên UI.
#[derive(Debug)]
pub enum NetworkEvent {
    Connected,
    MessageReceived(Message),
    MessageAcknowledged(MessageAck),
    /// An inbound frame that could not be used. The connection stays open.
    Rejected(ProtocolError),
    SendFailed(String),
    Disconnected { reason: Option<String> },
}

use tokio::sync::mpsc;

use crate::common::{NetworkEvent, ProtocolError};
use crate::protocol::{Frame, PayloadKind, decode_ack, decode_receive};

use super::session::FrameDispatcher;

/// Turns session events into `NetworkEvent`s for the application loop.
///
/// Version policy lives here: frames with a version outside
/// `supported_versions` are rejected before their payload is looked at.
pub struct EventDispatcher {
    event_sender: mpsc::UnboundedSender<NetworkEvent>,
    supported_versions: Vec<u8>,
}

impl EventDispatcher {
    pub fn new(event_sender: mpsc::UnboundedSender<NetworkEvent>, supported_versions: Vec<u8>) -> Self {
        Self {
            event_sender,
            supported_versions,
        }
    }

    fn emit(&self, event: NetworkEvent) {
        if let Err(err) = self.event_sender.send(event) {
            log::warn!("Failed to notify UI about network event: {err:?}");
        }
    }

    fn decode(&self, frame: Frame) -> Result<NetworkEvent, ProtocolError> {
        if !self.supported_versions.contains(&frame.version) {
            return Err(ProtocolError::UnsupportedVersion(frame.version));
        }

        match frame.payload_kind {
            PayloadKind::MessageReceive => decode_receive(&frame.payload).map(NetworkEvent::MessageReceived),
            PayloadKind::MessageAck => decode_ack(&frame.payload).map(NetworkEvent::MessageAcknowledged),
            // Client-to-server only.
            PayloadKind::MessageSend => Err(ProtocolError::UnsupportedPayloadKind(frame.payload_kind.tag())),
            PayloadKind::Unknown(tag) => Err(ProtocolError::UnsupportedPayloadKind(tag)),
        }
    }
}

impl FrameDispatcher for EventDispatcher {
    fn on_open(&mut self) {
        self.emit(NetworkEvent::Connected);
    }

    fn on_frame(&mut self, frame: Frame) {
        match self.decode(frame) {
            Ok(event) => self.emit(event),
            Err(err) => {
                log::warn!("Rejected inbound frame: {err}");
                self.emit(NetworkEvent::Rejected(err));
            }
        }
    }

    fn on_decode_error(&mut self, error: ProtocolError) {
        self.emit(NetworkEvent::Rejected(error));
    }

    fn on_close(&mut self, reason: Option<String>) {
        self.emit(NetworkEvent::Disconnected { reason });
    }
}

use chrono::{SubsecRound, Utc};
use tokio::sync::mpsc;

use crate::common::{ContactId, Message, NetworkCommand, NetworkEvent};
use crate::protocol::encode_message_frame;
use crate::storage::{HistoryLoaded, HistoryLoader, LoadRequest};

use super::state::{AppState, LoadState};

/// What the presentation layer should redraw after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Conversation {
        contact_id: ContactId,
        messages: Vec<Message>,
    },
    Loading(ContactId),
    LoadFailed {
        contact_id: ContactId,
        reason: String,
    },
    InboxPreview {
        contact_id: ContactId,
        message: Message,
    },
    Notice(String),
}

/// The single event processor. Every cache mutation goes through here.
pub struct ChatApp {
    state: AppState,
    history: HistoryLoader,
    command_sender: mpsc::Sender<NetworkCommand>,
}

impl ChatApp {
    pub fn new(
        state: AppState,
        history: HistoryLoader,
        command_sender: mpsc::Sender<NetworkCommand>,
    ) -> Self {
        Self {
            state,
            history,
            command_sender,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn select_contact(&mut self, contact_id: ContactId) -> Vec<UiUpdate> {
        self.state.current_contact = Some(contact_id);

        match self.history.load(contact_id, &self.state.cache) {
            LoadRequest::Cached => {
                self.state.load_state = LoadState::Idle;
                self.conversation_update(contact_id).into_iter().collect()
            }
            LoadRequest::Started | LoadRequest::InFlight => {
                self.state.load_state = LoadState::Loading;
                vec![UiUpdate::Loading(contact_id)]
            }
        }
    }

    /// Optimistic send to the selected contact. The message is appended only
    /// if it could be encoded. While the contact's history is not cached yet
    /// the message is held back and appended after the history lands.
    pub fn send_message(&mut self, content: String) -> Vec<UiUpdate> {
        let Some(contact_id) = self.state.current_contact else {
            log::warn!("No conversation selected; ignoring send");
            return Vec::new();
        };

        let message = Message {
            // Server sẽ sửa lại senderId.
            sender_id: self.state.local_user,
            recipient_id: contact_id,
            // Wire precision, so acks can match by timestamp.
            sent_at: Utc::now().trunc_subsecs(3),
            content,
        };

        let frame = match encode_message_frame(&message) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("Failed to encode message: {err}");
                return vec![self.notice("SEND_FAILED", err.to_string())];
            }
        };

        self.state.update_preview(contact_id, &message);
        let mut updates = if self.state.cache.contains(contact_id) {
            self.state.cache.append(contact_id, message);
            self.conversation_update(contact_id).into_iter().collect()
        } else {
            self.state.queue_pending(contact_id, message);
            // Failed fetches are retried here, otherwise the held message would wait forever.
            if !self.history.is_loading(contact_id) {
                self.history.load(contact_id, &self.state.cache);
            }
            self.state.load_state = LoadState::Loading;
            vec![UiUpdate::Loading(contact_id)]
        };

        if let Err(err) = self.command_sender.try_send(NetworkCommand::SendFrame(frame)) {
            log::warn!("Failed to send command to network: {err}");
            updates.push(self.notice("SEND_FAILED", format!("message not sent: {err}")));
        }
        updates
    }

    pub fn handle_network_event(&mut self, event: NetworkEvent) -> Vec<UiUpdate> {
        match event {
            NetworkEvent::Connected => {
                self.state.connected = true;
                vec![self.notice("CONNECTED", "connected to message server".to_string())]
            }
            NetworkEvent::MessageReceived(message) => self.handle_push(message),
            NetworkEvent::MessageAcknowledged(ack) => {
                let contact_id = ack.recipient_id;
                if self.state.cache.confirm(contact_id, &ack) {
                    if self.state.is_displayed(contact_id) {
                        return self.conversation_update(contact_id).into_iter().collect();
                    }
                } else if !self.state.confirm_pending(contact_id, &ack) {
                    log::debug!("Ack for unknown send to contact {contact_id}");
                }
                Vec::new()
            }
            NetworkEvent::Rejected(err) => vec![self.notice("FRAME_REJECTED", err.to_string())],
            NetworkEvent::SendFailed(reason) => vec![self.notice("SEND_FAILED", reason)],
            NetworkEvent::Disconnected { reason } => {
                self.state.connected = false;
                let reason = reason.unwrap_or_else(|| "closed".to_string());
                vec![self.notice("DISCONNECTED", reason)]
            }
        }
    }

    /// A cached conversation gets the push appended; an uncached one only
    /// gets an inbox preview, so no partial history is ever committed.
    fn handle_push(&mut self, message: Message) -> Vec<UiUpdate> {
        let contact_id = message.counterpart(self.state.local_user);
        self.state.update_preview(contact_id, &message);

        let mut updates = vec![UiUpdate::InboxPreview {
            contact_id,
            message: message.clone(),
        }];

        if !self.state.cache.contains(contact_id) {
            log::info!("Message from uncached contact {contact_id}; preview only");
            return updates;
        }

        self.state.cache.append(contact_id, message);
        if self.state.is_displayed(contact_id) {
            updates.extend(self.conversation_update(contact_id));
        }
        updates
    }

    pub fn handle_history_loaded(&mut self, loaded: HistoryLoaded) -> Vec<UiUpdate> {
        let contact_id = loaded.contact_id;
        let completed = self.history.complete(loaded, &mut self.state.cache);
        if completed.is_ok() {
            for message in self.state.take_pending(contact_id) {
                self.state.cache.append(contact_id, message);
            }
        }

        match completed {
            Ok(_) if self.state.is_displayed(contact_id) => {
                self.state.load_state = LoadState::Idle;
                self.conversation_update(contact_id).into_iter().collect()
            }
            Ok(_) => Vec::new(),
            Err(err) => {
                log::warn!("History fetch for contact {contact_id} failed: {err}");
                if self.state.is_displayed(contact_id) {
                    self.state.load_state = LoadState::Failed(err.to_string());
                    vec![UiUpdate::LoadFailed {
                        contact_id,
                        reason: err.to_string(),
                    }]
                } else {
                    vec![self.notice("HISTORY_FAILED", err.to_string())]
                }
            }
        }
    }

    /// Waits for queue space, so the close request is never dropped.
    pub async fn close(&self) {
        if let Err(err) = self.command_sender.send(NetworkCommand::Close).await {
            log::debug!("Network task already gone: {err}");
        }
    }

    fn conversation_update(&self, contact_id: ContactId) -> Option<UiUpdate> {
        self.state
            .snapshot(contact_id)
            .map(|messages| UiUpdate::Conversation { contact_id, messages })
    }

    fn notice(&mut self, kind: &'static str, message: String) -> UiUpdate {
        self.state.add_notice(kind, message.clone());
        UiUpdate::Notice(message)
    }
}

use std::collections::HashMap;

use crate::common::{ContactId, Message, MessageAck};

/// Per-conversation message sequences, keyed by the remote participant.
///
/// Sequences are append-only: `populate` never overwrites an existing entry
/// and `append` only pushes to the end.
#[derive(Debug, Default)]
pub struct ConversationCache {
    conversations: HashMap<ContactId, Vec<Message>>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` means the conversation was never fetched nor started locally.
    pub fn get(&self, contact_id: ContactId) -> Option<&[Message]> {
        self.conversations.get(&contact_id).map(Vec::as_slice)
    }

    pub fn contains(&self, contact_id: ContactId) -> bool {
        self.conversations.contains_key(&contact_id)
    }

    /// Sets the initial sequence for a contact. If the contact already has an
    /// entry the fetched history is discarded and `false` is returned.
    pub fn populate(&mut self, contact_id: ContactId, messages: Vec<Message>) -> bool {
        if self.conversations.contains_key(&contact_id) {
            log::warn!(
                "Discarding {} fetched messages for contact {contact_id}: entry already present",
                messages.len()
            );
            return false;
        }
        self.conversations.insert(contact_id, messages);
        true
    }

    /// Pushes one message to the end, starting the sequence if absent.
    pub fn append(&mut self, contact_id: ContactId, message: Message) {
        self.conversations.entry(contact_id).or_default().push(message);
    }

    /// Applies the server's sender id to the most recent optimistic message
    /// matching the ack. Position in the sequence is unchanged.
    pub fn confirm(&mut self, contact_id: ContactId, ack: &MessageAck) -> bool {
        let Some(messages) = self.conversations.get_mut(&contact_id) else {
            return false;
        };

        match messages
            .iter_mut()
            .rev()
            .find(|m| m.recipient_id == ack.recipient_id && m.sent_at == ack.sent_at)
        {
            Some(message) => {
                message.sender_id = ack.sender_id;
                true
            }
            None => false,
        }
    }
}

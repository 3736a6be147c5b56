use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::common::{ContactId, Message, MessageAck, UserId};
use crate::storage::ConversationCache;

/// Giữ tối đa 100 notice để không chiếm quá nhiều bộ nhớ.
const MAX_NOTICES: usize = 100;

/// Sự kiện hệ thống hiển thị cho người dùng (lỗi giải mã, mất kết nối...).
#[derive(Debug, Clone)]
pub struct Notice {
    pub timestamp: DateTime<Utc>,
    pub kind: &'static str,
    pub message: String,
}

/// Loading state of the selected conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    /// Retry by selecting the contact again.
    Failed(String),
}

/// Trạng thái cục bộ của UI.
pub struct AppState {
    pub local_user: UserId,
    pub cache: ConversationCache,
    pub current_contact: Option<ContactId>,
    pub load_state: LoadState,
    /// Latest message per contact, for the inbox. Includes contacts whose
    /// conversation is not cached.
    pub previews: BTreeMap<ContactId, Message>,
    /// Local sends waiting for their conversation's history to be cached.
    pub pending_sends: HashMap<ContactId, Vec<Message>>,
    pub connected: bool,
    pub notices: VecDeque<Notice>,
}

impl AppState {
    pub fn new(local_user: UserId) -> Self {
        Self {
            local_user,
            cache: ConversationCache::new(),
            current_contact: None,
            load_state: LoadState::Idle,
            previews: BTreeMap::new(),
            pending_sends: HashMap::new(),
            connected: false,
            notices: VecDeque::new(),
        }
    }

    pub fn is_displayed(&self, contact_id: ContactId) -> bool {
        self.current_contact == Some(contact_id)
    }

    /// Copy of a conversation for rendering.
    pub fn snapshot(&self, contact_id: ContactId) -> Option<Vec<Message>> {
        self.cache.get(contact_id).map(<[Message]>::to_vec)
    }

    pub fn update_preview(&mut self, contact_id: ContactId, message: &Message) {
        self.previews.insert(contact_id, message.clone());
    }

    pub fn queue_pending(&mut self, contact_id: ContactId, message: Message) {
        self.pending_sends.entry(contact_id).or_default().push(message);
    }

    /// Held sends for a contact, oldest first.
    pub fn take_pending(&mut self, contact_id: ContactId) -> Vec<Message> {
        self.pending_sends.remove(&contact_id).unwrap_or_default()
    }

    /// Ack for a send that is still held back.
    pub fn confirm_pending(&mut self, contact_id: ContactId, ack: &MessageAck) -> bool {
        let held = self.pending_sends.get_mut(&contact_id).into_iter().flatten();
        match held.rev().find(|m| m.sent_at == ack.sent_at) {
            Some(message) => {
                message.sender_id = ack.sender_id;
                true
            }
            None => false,
        }
    }

    pub fn add_notice(&mut self, kind: &'static str, message: String) {
        self.notices.push_back(Notice {
            timestamp: Utc::now(),
            kind,
            message,
        });
        if self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }
}

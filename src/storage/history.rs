//! Cold-start history for conversations that are not cached yet.
//!
//! Fetches run as spawned tasks and report back over a channel, so the
//! result is applied on the same loop that owns the cache. At most one fetch
//! per contact is outstanding at any time.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::common::{ContactId, HistoryFetchError, Message};

use super::cache::ConversationCache;

#[async_trait]
pub trait HistoryFetcher: Send + Sync {
    async fn fetch_history(&self, contact_id: ContactId) -> Result<Vec<Message>, HistoryFetchError>;
}

/// Outcome of one fetch, delivered back to the application loop.
#[derive(Debug)]
pub struct HistoryLoaded {
    pub contact_id: ContactId,
    pub result: Result<Vec<Message>, HistoryFetchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRequest {
    /// Already in the cache, nothing fetched.
    Cached,
    /// A fetch was started.
    Started,
    /// A fetch for this contact is already outstanding.
    InFlight,
}

pub struct HistoryLoader {
    fetcher: Arc<dyn HistoryFetcher>,
    in_flight: HashSet<ContactId>,
    result_sender: mpsc::UnboundedSender<HistoryLoaded>,
}

impl HistoryLoader {
    pub fn new(
        fetcher: Arc<dyn HistoryFetcher>,
        result_sender: mpsc::UnboundedSender<HistoryLoaded>,
    ) -> Self {
        Self {
            fetcher,
            in_flight: HashSet::new(),
            result_sender,
        }
    }

    pub fn load(&mut self, contact_id: ContactId, cache: &ConversationCache) -> LoadRequest {
        if cache.contains(contact_id) {
            return LoadRequest::Cached;
        }
        if !self.in_flight.insert(contact_id) {
            log::debug!("History for contact {contact_id} already in flight");
            return LoadRequest::InFlight;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let result_sender = self.result_sender.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch_history(contact_id).await;
            if result_sender.send(HistoryLoaded { contact_id, result }).is_err() {
                log::debug!("History for contact {contact_id} resolved after shutdown");
            }
        });
        LoadRequest::Started
    }

    pub fn is_loading(&self, contact_id: ContactId) -> bool {
        self.in_flight.contains(&contact_id)
    }

    /// Applies a finished fetch. `Ok(true)` when the cache was populated,
    /// `Ok(false)` when an entry appeared meanwhile and the result was dropped.
    /// On error the contact stays uncached and can be loaded again.
    pub fn complete(
        &mut self,
        loaded: HistoryLoaded,
        cache: &mut ConversationCache,
    ) -> Result<bool, HistoryFetchError> {
        self.in_flight.remove(&loaded.contact_id);
        let messages = loaded.result?;
        log::info!(
            "Loaded {} messages for contact {}",
            messages.len(),
            loaded.contact_id
        );
        Ok(cache.populate(loaded.contact_id, messages))
    }
}

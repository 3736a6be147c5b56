pub mod cache;
pub mod history;

pub use cache::ConversationCache;
pub use history::{HistoryFetcher, HistoryLoaded, HistoryLoader, LoadRequest};

pub mod commands;
pub mod error;
pub mod events;
pub mod types;

pub use commands::NetworkCommand;
pub use error::{HistoryFetchError, ProtocolError, TransportError};
pub use events::NetworkEvent;
pub use types::{ContactId, Message, MessageAck, UserId};

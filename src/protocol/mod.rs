pub mod frame;
pub mod payload;

pub use frame::{Frame, PROTOCOL_VERSION, PayloadKind, decode_frame};
pub use payload::{decode_ack, decode_receive, encode_message_frame};

/// Lệnh UI gửi xuống tầng mạng.
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    /// A fully encoded frame, ready for the wire.
    SendFrame(Vec<u8>),
    /// Đóng kết nối. The session does not reconnect afterwards.
    Close,
}

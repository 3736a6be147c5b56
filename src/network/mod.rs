pub mod client;
pub mod dispatch;
pub mod http;
pub mod session;
pub mod transport;

pub use client::ChatClient;
pub use http::ApiClient;

//! WebSocket halves the session reads from and writes to.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message as WsFrame};

use crate::common::TransportError;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Where the session writes encoded frames.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, bytes: Vec<u8>) -> Result<(), TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Received WebSocket message, reduced to what the client cares about.
#[derive(Debug)]
pub enum Incoming {
    Binary(Vec<u8>),
    Text(String),
    Close { code: u16, reason: String },
}

pub struct WsWriter {
    sink: SplitSink<WsStream, WsFrame>,
}

#[async_trait]
impl FrameSink for WsWriter {
    async fn send_frame(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.sink
            .send(WsFrame::Binary(bytes))
            .await
            .map_err(|err| TransportError::Io(err.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .close()
            .await
            .map_err(|err| TransportError::Io(err.to_string()))
    }
}

pub struct WsReader {
    stream: SplitStream<WsStream>,
}

impl WsReader {
    /// Next data or close message; `None` once the stream ends.
    ///
    /// Ping/pong and raw frames are skipped, tungstenite answers pings itself.
    pub async fn recv(&mut self) -> Option<Result<Incoming, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(WsFrame::Binary(data)) => return Some(Ok(Incoming::Binary(data.to_vec()))),
                Ok(WsFrame::Text(text)) => return Some(Ok(Incoming::Text(text.to_string()))),
                Ok(WsFrame::Close(close_frame)) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    return Some(Ok(Incoming::Close { code, reason }));
                }
                Ok(WsFrame::Ping(_) | WsFrame::Pong(_) | WsFrame::Frame(_)) => continue,
                Err(err) => return Some(Err(TransportError::Io(err.to_string()))),
            }
        }
    }
}

/// Performs the WebSocket handshake, attaching the session cookie if any.
pub async fn connect(
    url: &str,
    session_cookie: Option<&str>,
) -> Result<(WsWriter, WsReader), TransportError> {
    let mut request = url
        .into_client_request()
        .map_err(|err| TransportError::Connect(format!("invalid WebSocket URL {url}: {err}")))?;

    if let Some(cookie) = session_cookie {
        let value = HeaderValue::from_str(cookie)
            .map_err(|err| TransportError::Connect(format!("invalid cookie header: {err}")))?;
        request
            .headers_mut()
            .insert(tungstenite::http::header::COOKIE, value);
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|err| TransportError::Connect(err.to_string()))?;

    let (sink, stream) = ws_stream.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

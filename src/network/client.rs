use std::error::Error;

use tokio::sync::mpsc;

use crate::common::{NetworkCommand, NetworkEvent, TransportError};

use super::dispatch::EventDispatcher;
use super::session::{SessionState, TransportSession};
use super::transport::{FrameSink, Incoming, WsReader, WsWriter, connect};

/// Owns the WebSocket connection for the lifetime of one session.
pub struct ChatClient {
    event_sender: mpsc::UnboundedSender<NetworkEvent>,
    command_receiver: mpsc::Receiver<NetworkCommand>,
    ws_url: String,
    session_cookie: Option<String>,
    supported_versions: Vec<u8>,
}

impl ChatClient {
    pub fn new(
        event_sender: mpsc::UnboundedSender<NetworkEvent>,
        command_receiver: mpsc::Receiver<NetworkCommand>,
        ws_url: String,
        session_cookie: Option<String>,
        supported_versions: Vec<u8>,
    ) -> Self {
        Self {
            event_sender,
            command_receiver,
            ws_url,
            session_cookie,
            supported_versions,
        }
    }

    pub async fn run(mut self) -> Result<(), Box<dyn Error>> {
        let mut session: TransportSession<WsWriter> = TransportSession::new();
        session.on_frame(EventDispatcher::new(
            self.event_sender.clone(),
            self.supported_versions.clone(),
        ));

        log::info!("Connecting to {}", self.ws_url);
        let mut reader = match connect(&self.ws_url, self.session_cookie.as_deref()).await {
            Ok((writer, reader)) => {
                session.open(writer)?;
                reader
            }
            Err(err) => {
                // No retry here; reconnecting is the caller's decision.
                session.handshake_failed(err);
                return Ok(());
            }
        };

        log::info!("Network event loop started");
        self.event_loop(&mut session, &mut reader).await;
        Ok(())
    }

    async fn event_loop(&mut self, session: &mut TransportSession<WsWriter>, reader: &mut WsReader) {
        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(NetworkCommand::Close) | None => {
                            session.close().await;
                            break;
                        }
                        Some(command) => {
                            self.handle_command(command, session).await;
                            // A failed write closes the session.
                            if session.state() == SessionState::Closed {
                                break;
                            }
                        }
                    }
                }
                incoming = reader.recv() => {
                    if !handle_incoming(incoming, session) {
                        break;
                    }
                }
            }
        }
    }

    async fn handle_command<S: FrameSink>(
        &mut self,
        command: NetworkCommand,
        session: &mut TransportSession<S>,
    ) {
        match command {
            NetworkCommand::SendFrame(bytes) => {
                if let Err(err) = session.send(bytes).await {
                    log::warn!("Send rejected: {err}");
                    if let Err(err) = self.event_sender.send(NetworkEvent::SendFailed(err.to_string())) {
                        log::warn!("Failed to notify UI about send failure: {err:?}");
                    }
                }
            }
            NetworkCommand::Close => session.close().await,
        }
    }
}

/// Feeds one read result into the session. Returns `false` once the
/// connection is gone.
fn handle_incoming<S: FrameSink>(
    incoming: Option<Result<Incoming, TransportError>>,
    session: &mut TransportSession<S>,
) -> bool {
    match incoming {
        Some(Ok(Incoming::Binary(bytes))) => {
            session.receive(&bytes);
            true
        }
        Some(Ok(Incoming::Text(text))) => {
            log::warn!("Ignoring text message on binary protocol ({} bytes)", text.len());
            true
        }
        Some(Ok(Incoming::Close { code, reason })) => {
            session.fail(TransportError::ClosedByPeer { code, reason });
            false
        }
        Some(Err(err)) => {
            session.fail(err);
            false
        }
        None => {
            session.fail(TransportError::Io("stream ended".to_string()));
            false
        }
    }
}

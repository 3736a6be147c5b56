//! Lifecycle of the single duplex connection.
//!
//! `Connecting -> Open -> Closed`, or `Connecting -> Closed` when the
//! handshake fails. A closed session stays closed; reconnecting means
//! building a new one.

use crate::common::{ProtocolError, TransportError};
use crate::protocol::{Frame, decode_frame};

use super::transport::FrameSink;

/// Number of leading bytes dumped to the log when a frame fails to decode.
const MALFORMED_DUMP_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

/// Receives session events. One method per event kind.
pub trait FrameDispatcher: Send {
    fn on_open(&mut self) {}

    fn on_frame(&mut self, frame: Frame);

    fn on_decode_error(&mut self, _error: ProtocolError) {}

    fn on_close(&mut self, _reason: Option<String>) {}
}

pub struct TransportSession<S> {
    state: SessionState,
    sink: Option<S>,
    dispatcher: Option<Box<dyn FrameDispatcher>>,
}

impl<S: FrameSink> TransportSession<S> {
    pub fn new() -> Self {
        Self {
            state: SessionState::Connecting,
            sink: None,
            dispatcher: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Registers the dispatcher, replacing any previous one.
    pub fn on_frame(&mut self, dispatcher: impl FrameDispatcher + 'static) {
        self.dispatcher = Some(Box::new(dispatcher));
    }

    /// Handshake succeeded.
    pub fn open(&mut self, sink: S) -> Result<(), TransportError> {
        if self.state != SessionState::Connecting {
            return Err(TransportError::NotOpen(self.state));
        }
        self.sink = Some(sink);
        self.state = SessionState::Open;
        log::info!("Session open");
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.on_open();
        }
        Ok(())
    }

    pub fn handshake_failed(&mut self, error: TransportError) {
        if self.state == SessionState::Connecting {
            log::error!("Handshake failed: {error}");
            self.transition_closed(Some(error.to_string()));
        }
    }

    /// Writes one fully encoded frame. Outside `Open` the frame is rejected;
    /// a write failure closes the session.
    pub async fn send(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let sink = match (self.state, self.sink.as_mut()) {
            (SessionState::Open, Some(sink)) => sink,
            _ => return Err(TransportError::NotOpen(self.state)),
        };

        let written = sink.send_frame(bytes).await;
        if let Err(err) = written {
            let reason = err.to_string();
            self.fail(TransportError::Io(reason.clone()));
            return Err(TransportError::Io(reason));
        }
        Ok(())
    }

    /// Decodes one inbound buffer and hands the result to the dispatcher.
    /// Malformed input is reported, never fatal.
    pub fn receive(&mut self, bytes: &[u8]) {
        if self.state != SessionState::Open {
            log::debug!("Dropping {} inbound bytes, session is {:?}", bytes.len(), self.state);
            return;
        }

        let Some(dispatcher) = self.dispatcher.as_mut() else {
            log::warn!("No dispatcher registered; dropping {} inbound bytes", bytes.len());
            return;
        };

        match decode_frame(bytes) {
            Ok(frame) => dispatcher.on_frame(frame),
            Err(err) => {
                let head = &bytes[..bytes.len().min(MALFORMED_DUMP_LEN)];
                log::warn!("Malformed inbound frame ({err}): {}", hex::encode(head));
                dispatcher.on_decode_error(err);
            }
        }
    }

    /// Transport-level failure while open.
    pub fn fail(&mut self, error: TransportError) {
        if self.state == SessionState::Open {
            log::warn!("Session closed by transport error: {error}");
            self.sink = None;
            self.transition_closed(Some(error.to_string()));
        }
    }

    /// Explicit close. Already dispatched frames are unaffected.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Some(mut sink) = self.sink.take() {
            if let Err(err) = sink.close().await {
                log::debug!("Error while closing transport: {err}");
            }
        }
        log::info!("Session closed");
        self.transition_closed(None);
    }

    fn transition_closed(&mut self, reason: Option<String>) {
        self.state = SessionState::Closed;
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.on_close(reason);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::protocol::PayloadKind;
    use crate::protocol::frame::encode_frame;

    /// In-memory sink recording every frame written.
    #[derive(Clone, Default)]
    pub(crate) struct MemorySink {
        pub sent: Arc<Mutex<Vec<Vec<u8>>>>,
        pub fail_writes: bool,
    }

    #[async_trait]
    impl FrameSink for MemorySink {
        async fn send_frame(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
            if self.fail_writes {
                return Err(TransportError::Io("broken pipe".to_string()));
            }
            self.sent.lock().unwrap().push(bytes);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[derive(Debug, PartialEq)]
    enum Seen {
        Open,
        Frame(u8, Vec<u8>),
        DecodeError,
        Close(Option<String>),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    impl FrameDispatcher for Recorder {
        fn on_open(&mut self) {
            self.seen.lock().unwrap().push(Seen::Open);
        }

        fn on_frame(&mut self, frame: Frame) {
            self.seen
                .lock()
                .unwrap()
                .push(Seen::Frame(frame.payload_kind.tag(), frame.payload));
        }

        fn on_decode_error(&mut self, _error: ProtocolError) {
            self.seen.lock().unwrap().push(Seen::DecodeError);
        }

        fn on_close(&mut self, reason: Option<String>) {
            self.seen.lock().unwrap().push(Seen::Close(reason));
        }
    }

    fn open_session() -> (TransportSession<MemorySink>, Recorder, MemorySink) {
        let recorder = Recorder::default();
        let sink = MemorySink::default();
        let mut session = TransportSession::new();
        session.on_frame(recorder.clone());
        session.open(sink.clone()).unwrap();
        (session, recorder, sink)
    }

    #[tokio::test]
    async fn send_is_rejected_before_open_and_after_close() {
        let mut session: TransportSession<MemorySink> = TransportSession::new();
        assert!(matches!(
            session.send(vec![1]).await,
            Err(TransportError::NotOpen(SessionState::Connecting))
        ));

        let (mut session, _recorder, sink) = open_session();
        session.send(vec![1, 2, 3]).await.unwrap();
        session.close().await;

        assert!(matches!(
            session.send(vec![4]).await,
            Err(TransportError::NotOpen(SessionState::Closed))
        ));
        assert_eq!(*sink.sent.lock().unwrap(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn frames_are_delivered_in_arrival_order() {
        let (mut session, recorder, _sink) = open_session();

        for payload in [b"one".as_slice(), b"two", b"three"] {
            let bytes = encode_frame(1, PayloadKind::MessageReceive, payload).unwrap();
            session.receive(&bytes);
        }

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![
                Seen::Open,
                Seen::Frame(2, b"one".to_vec()),
                Seen::Frame(2, b"two".to_vec()),
                Seen::Frame(2, b"three".to_vec()),
            ]
        );
    }

    #[test]
    fn malformed_bytes_keep_the_session_open() {
        let (mut session, recorder, _sink) = open_session();

        session.receive(&[1, 2, 0, 0, 0, 99, 0]);
        let bytes = encode_frame(1, PayloadKind::MessageReceive, b"after").unwrap();
        session.receive(&bytes);

        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![Seen::Open, Seen::DecodeError, Seen::Frame(2, b"after".to_vec())]
        );
    }

    #[test]
    fn handshake_failure_closes_without_opening() {
        let recorder = Recorder::default();
        let mut session: TransportSession<MemorySink> = TransportSession::new();
        session.on_frame(recorder.clone());

        session.handshake_failed(TransportError::Connect("refused".to_string()));

        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.open(MemorySink::default()).is_err());
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![Seen::Close(Some("connect failed: refused".to_string()))]
        );
    }

    #[tokio::test]
    async fn write_failure_closes_the_session() {
        let recorder = Recorder::default();
        let mut session = TransportSession::new();
        session.on_frame(recorder.clone());
        session
            .open(MemorySink {
                fail_writes: true,
                ..MemorySink::default()
            })
            .unwrap();

        assert!(session.send(vec![1]).await.is_err());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn nothing_is_delivered_after_close() {
        let (mut session, recorder, _sink) = open_session();
        session.close().await;

        let bytes = encode_frame(1, PayloadKind::MessageReceive, b"late").unwrap();
        session.receive(&bytes);

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![Seen::Open, Seen::Close(None)]
        );
    }
}

use ewebsock::{Options, WsEvent, WsMessage, WsReceiver, WsSender};
use tracing::debug;

use crate::gateway::transport::{
    Connector, ReadyState, Transport, TransportEvent, TransportOptions, WireMessage,
};
use crate::{Error, Result, Wakeup};

/// `ewebsock`-backed transport. The backend does not surface close codes, so
/// clean closes report no code and socket errors map to a reset upstream.
pub struct WebsocketTransport {
    sender: WsSender,
    receiver: WsReceiver,
    state: ReadyState,
}

impl Transport for WebsocketTransport {
    fn send(&mut self, msg: WireMessage) {
        let msg = match msg {
            WireMessage::Text(s) => WsMessage::Text(s),
            WireMessage::Binary(b) => WsMessage::Binary(b),
        };
        self.sender.send(msg);
    }

    fn try_recv(&mut self) -> Option<TransportEvent> {
        loop {
            let event = self.receiver.try_recv()?;
            match event {
                WsEvent::Opened => {
                    self.state = ReadyState::Open;
                    return Some(TransportEvent::Opened);
                }
                WsEvent::Message(WsMessage::Text(s)) => {
                    return Some(TransportEvent::Message(WireMessage::Text(s)));
                }
                WsEvent::Message(WsMessage::Binary(b)) => {
                    return Some(TransportEvent::Message(WireMessage::Binary(b)));
                }
                WsEvent::Message(WsMessage::Ping(payload)) => {
                    debug!("answering transport ping");
                    self.sender.send(WsMessage::Pong(payload));
                }
                WsEvent::Message(_) => {}
                WsEvent::Error(err) => {
                    self.state = ReadyState::Closed;
                    return Some(TransportEvent::Error(err));
                }
                WsEvent::Closed => {
                    self.state = ReadyState::Closed;
                    return Some(TransportEvent::Closed {
                        code: None,
                        reason: String::new(),
                        clean: true,
                    });
                }
            }
        }
    }

    fn close(&mut self, _code: u16) {
        self.state = ReadyState::Closing;
        self.sender.close();
    }

    fn terminate(&mut self) {
        // ewebsock has no abortive teardown; the socket dies when the shard
        // drops the transport
        self.state = ReadyState::Closed;
    }

    fn ready_state(&self) -> ReadyState {
        self.state
    }
}

/// Opens [`WebsocketTransport`]s, waking the host loop on inbound traffic.
pub struct WebsocketConnector<W: Wakeup> {
    wakeup: W,
}

impl<W: Wakeup> WebsocketConnector<W> {
    pub fn new(wakeup: W) -> Self {
        WebsocketConnector { wakeup }
    }
}

/// Build a connector from a plain closure.
pub fn connector_from_fn(
    wakeup: impl Fn() + Send + Sync + Clone + 'static,
) -> WebsocketConnector<impl Wakeup> {
    #[derive(Clone)]
    struct FnWakeup<F>(F);

    impl<F> Wakeup for FnWakeup<F>
    where
        F: Fn() + Send + Sync + Clone + 'static,
    {
        fn wake(&self) {
            (self.0)()
        }
    }

    WebsocketConnector::new(FnWakeup(wakeup))
}

impl<W: Wakeup> Connector for WebsocketConnector<W> {
    fn open(&mut self, url: &str, options: &TransportOptions) -> Result<Box<dyn Transport>> {
        let mut ws_options = Options::default();
        if let Some(max) = options.max_frame_size {
            ws_options.max_incoming_frame_size = max;
        }

        let wake = self.wakeup.clone();
        let (sender, receiver) =
            ewebsock::connect_with_wakeup(url, ws_options, move || wake.wake())
                .map_err(Error::Transport)?;

        Ok(Box::new(WebsocketTransport {
            sender,
            receiver,
            state: ReadyState::Connecting,
        }))
    }
}

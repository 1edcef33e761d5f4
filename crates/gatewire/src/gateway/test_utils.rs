#![cfg(test)]
//! Scripted transport for driving a shard without sockets.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::gateway::transport::{
    Connector, ReadyState, Transport, TransportEvent, TransportOptions, WireMessage,
};
use crate::gateway::wire::Envelope;
use crate::Result;

pub struct FakeState {
    pub inbound: VecDeque<TransportEvent>,
    pub sent: Vec<WireMessage>,
    pub state: ReadyState,
    pub closed_with: Option<u16>,
    pub terminated: bool,
}

pub type FakeHandle = Rc<RefCell<FakeState>>;

pub struct FakeTransport {
    state: FakeHandle,
}

impl Transport for FakeTransport {
    fn send(&mut self, msg: WireMessage) {
        self.state.borrow_mut().sent.push(msg);
    }

    fn try_recv(&mut self) -> Option<TransportEvent> {
        let mut s = self.state.borrow_mut();
        let event = s.inbound.pop_front()?;
        match &event {
            TransportEvent::Opened => s.state = ReadyState::Open,
            TransportEvent::Closed { .. } | TransportEvent::Error(_) => {
                s.state = ReadyState::Closed;
            }
            TransportEvent::Message(_) => {}
        }
        Some(event)
    }

    fn close(&mut self, code: u16) {
        let mut s = self.state.borrow_mut();
        s.state = ReadyState::Closed;
        s.closed_with = Some(code);
    }

    fn terminate(&mut self) {
        let mut s = self.state.borrow_mut();
        s.state = ReadyState::Closed;
        s.terminated = true;
    }

    fn ready_state(&self) -> ReadyState {
        self.state.borrow().state
    }
}

type OpenLog = Rc<RefCell<Vec<(String, FakeHandle)>>>;

/// Records every open and hands the test a scripted state per socket.
pub struct FakeConnector {
    opens: OpenLog,
}

impl FakeConnector {
    pub fn new() -> (FakeConnector, OpenLog) {
        let opens: OpenLog = Rc::default();
        (
            FakeConnector {
                opens: opens.clone(),
            },
            opens,
        )
    }
}

impl Connector for FakeConnector {
    fn open(&mut self, url: &str, _options: &TransportOptions) -> Result<Box<dyn Transport>> {
        let handle: FakeHandle = Rc::new(RefCell::new(FakeState {
            inbound: VecDeque::new(),
            sent: Vec::new(),
            state: ReadyState::Connecting,
            closed_with: None,
            terminated: false,
        }));
        self.opens.borrow_mut().push((url.to_owned(), handle.clone()));
        Ok(Box::new(FakeTransport { state: handle }))
    }
}

pub fn push_open(handle: &FakeHandle) {
    handle.borrow_mut().inbound.push_back(TransportEvent::Opened);
}

pub fn push_envelope(handle: &FakeHandle, env: Value) {
    handle
        .borrow_mut()
        .inbound
        .push_back(TransportEvent::Message(WireMessage::Text(env.to_string())));
}

pub fn push_binary(handle: &FakeHandle, bytes: Vec<u8>) {
    handle
        .borrow_mut()
        .inbound
        .push_back(TransportEvent::Message(WireMessage::Binary(bytes)));
}

pub fn push_close(handle: &FakeHandle, code: u16, reason: &str, clean: bool) {
    handle.borrow_mut().inbound.push_back(TransportEvent::Closed {
        code: Some(code),
        reason: reason.to_owned(),
        clean,
    });
}

/// Decode the frames the shard sent, assuming the json encoding.
pub fn sent_envelopes(handle: &FakeHandle) -> Vec<Envelope> {
    handle
        .borrow()
        .sent
        .iter()
        .map(|msg| match msg {
            WireMessage::Text(s) => serde_json::from_str(s).expect("sent frame json"),
            WireMessage::Binary(b) => serde_json::from_slice(b).expect("sent frame json"),
        })
        .collect()
}

//! In-memory transport for connector tests.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::connector::ConnectorOptions;
use crate::error::{Error, Result};

use super::{SignalHandler, Transport, TransportFactory, TransportSignal};

/// Everything the mock observed.
#[derive(Default)]
pub(crate) struct MockState {
    pub emits: Vec<(String, Value)>,
    pub opens: usize,
    pub disconnects: usize,
    pub reconnects: usize,
    pub handler: Option<SignalHandler>,
}

/// Factory whose transports record calls and let tests inject signals.
#[derive(Clone, Default)]
pub(crate) struct MockFactory {
    state: Arc<Mutex<MockState>>,
    unavailable: bool,
    connect_on_reconnect: bool,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory that refuses to open.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// A factory whose transports report `Connect` from inside `reconnect()`.
    pub fn connecting_on_reconnect() -> Self {
        Self {
            connect_on_reconnect: true,
            ..Self::default()
        }
    }

    /// Delivers `signal` as if the transport had observed it.
    pub fn simulate(&self, signal: TransportSignal) {
        let handler = self.state.lock().handler.clone();
        let handler = handler.expect("transport opened");
        handler(signal);
    }

    pub fn emits(&self) -> Vec<(String, Value)> {
        self.state.lock().emits.clone()
    }

    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }

    pub fn reconnects(&self) -> usize {
        self.state.lock().reconnects
    }
}

impl TransportFactory for MockFactory {
    fn open(
        &self,
        _options: &ConnectorOptions,
        handler: SignalHandler,
    ) -> Result<Box<dyn Transport>> {
        if self.unavailable {
            return Err(Error::transport_unavailable("mock transport disabled"));
        }

        let mut state = self.state.lock();
        state.opens += 1;
        state.handler = Some(handler);

        Ok(Box::new(MockTransport {
            state: Arc::clone(&self.state),
            connect_on_reconnect: self.connect_on_reconnect,
        }))
    }
}

struct MockTransport {
    state: Arc<Mutex<MockState>>,
    connect_on_reconnect: bool,
}

impl Transport for MockTransport {
    fn emit(&self, event: &str, payload: &Value) -> Result<()> {
        self.state
            .lock()
            .emits
            .push((event.to_string(), payload.clone()));
        Ok(())
    }

    fn disconnect(&self) {
        self.state.lock().disconnects += 1;
    }

    fn reconnect(&self) {
        let handler = {
            let mut state = self.state.lock();
            state.reconnects += 1;
            state.handler.clone()
        };

        if self.connect_on_reconnect
            && let Some(handler) = handler
        {
            handler(TransportSignal::Connect);
        }
    }
}

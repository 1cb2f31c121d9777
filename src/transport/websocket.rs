//! Socket.IO client over WebSocket.
//!
//! This module owns the one persistent connection to the game server,
//! including the Socket.IO handshake, heartbeats, and reconnection.
//!
//! # Event Loop
//!
//! [`WebSocketTransport::spawn`] starts a tokio task that:
//!
//! - Connects and completes the Engine.IO / Socket.IO handshake
//! - Forwards inbound events to the [`SignalHandler`]
//! - Writes outbound frames issued through [`Transport::emit`]
//! - Answers pings and watches the heartbeat deadline
//! - Retries with [`Backoff`] after a lost session or failed attempt
//!
//! ```text
//!            ┌──────────── reconnect ────────────┐
//!            ▼                                   │
//!   Connecting ──ok──► Session ──lost──► Backoff ┘
//!       │  ▲              │                 │
//!     fail └──────────────┼─────────────────┘
//!                     disconnect()
//!                         ▼
//!                       Idle ──reconnect()──► Connecting
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::connector::ConnectorOptions;
use crate::error::{Error, Result};
use crate::protocol::{Handshake, Packet};

use super::{Backoff, SignalHandler, Transport, TransportFactory, TransportSignal};

// ============================================================================
// Constants
// ============================================================================

/// Disconnect reason after [`Transport::disconnect`].
pub const REASON_CLIENT_DISCONNECT: &str = "io client disconnect";

/// Disconnect reason when the server closed the Socket.IO session.
pub const REASON_SERVER_DISCONNECT: &str = "io server disconnect";

/// Disconnect reason when no ping arrived in time.
pub const REASON_PING_TIMEOUT: &str = "ping timeout";

/// Disconnect reason when the WebSocket closed.
pub const REASON_TRANSPORT_CLOSE: &str = "transport close";

/// Disconnect reason when the WebSocket failed.
pub const REASON_TRANSPORT_ERROR: &str = "transport error";

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;

/// Internal commands for the event loop.
enum TransportCommand {
    /// Write an encoded frame if a session is live.
    Emit(String),
    /// Close the session and idle.
    Disconnect,
    /// Leave idle or skip the current backoff wait.
    Reconnect,
}

/// Why a session or attempt ended.
enum SessionEnd {
    /// Lost without being asked; reconnection policy applies.
    Lost(&'static str),
    /// Closed by [`Transport::disconnect`].
    ClientDisconnect,
    /// Every transport handle was dropped.
    Shutdown,
}

/// What the session loop does after one inbound frame.
enum Incoming {
    Continue,
    Ping,
    End(SessionEnd),
}

/// How a backoff wait ended.
enum WaitEnd {
    Elapsed,
    Reconnect,
    Disconnect,
    Shutdown,
}

/// Settings the event loop needs, extracted from [`ConnectorOptions`].
struct LoopConfig {
    url: Url,
    reconnection: bool,
    connect_timeout: Duration,
    backoff: Backoff,
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Handle to the Socket.IO event loop.
///
/// Dropping the handle shuts the loop down.
pub struct WebSocketTransport {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<TransportCommand>,
}

impl WebSocketTransport {
    /// Starts the event loop on the current tokio runtime.
    ///
    /// Returns immediately; the first connection attempt runs in the
    /// background and reports through `handler`.
    ///
    /// # Errors
    ///
    /// - [`Error::TransportUnavailable`] if called outside a tokio runtime
    /// - [`Error::Url`] / [`Error::Config`] if the endpoint is invalid
    pub fn spawn(options: &ConnectorOptions, handler: SignalHandler) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::transport_unavailable(format!("no async runtime: {e}")))?;

        let config = LoopConfig {
            url: options.endpoint_url()?,
            reconnection: options.reconnection,
            connect_timeout: options.connect_timeout,
            backoff: Backoff::from_options(options),
        };

        debug!(url = %config.url, "Starting transport event loop");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        runtime.spawn(Self::run_event_loop(config, command_rx, handler));

        Ok(Self { command_tx })
    }

    /// Event loop that owns the connection across reconnects.
    async fn run_event_loop(
        mut config: LoopConfig,
        mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
        handler: SignalHandler,
    ) {
        let mut active = true;

        loop {
            if !active {
                match command_rx.recv().await {
                    Some(TransportCommand::Reconnect) => {
                        debug!("Reconnect requested");
                        config.backoff.reset();
                        active = true;
                    }
                    Some(TransportCommand::Emit(_)) => {
                        debug!("No live session, outbound frame dropped");
                    }
                    Some(TransportCommand::Disconnect) => {}
                    None => break,
                }
                continue;
            }

            match Self::run_attempt(&config, &mut command_rx, &handler).await {
                Ok(SessionEnd::Lost(reason)) => {
                    config.backoff.reset();
                    info!(reason, "Disconnected from game server");
                    handler(TransportSignal::Disconnect {
                        reason: reason.to_string(),
                    });
                }
                Ok(SessionEnd::ClientDisconnect) => {
                    active = false;
                    continue;
                }
                Ok(SessionEnd::Shutdown) => break,
                Err(e) => {
                    warn!(error = %e, "Connection attempt failed");
                    handler(TransportSignal::Error {
                        message: e.to_string(),
                    });

                    if !config.reconnection {
                        handler(TransportSignal::ReconnectFailed);
                        active = false;
                        continue;
                    }
                }
            }

            if !config.reconnection {
                active = false;
                continue;
            }

            let Some(delay) = config.backoff.next_delay() else {
                warn!(
                    attempts = config.backoff.attempts(),
                    "Reconnection attempts exhausted"
                );
                handler(TransportSignal::ReconnectFailed);
                active = false;
                continue;
            };
            let attempt = config.backoff.attempts();

            debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting to reconnect");

            match Self::wait_backoff(delay, &mut command_rx).await {
                WaitEnd::Elapsed => {}
                WaitEnd::Reconnect => config.backoff.reset(),
                WaitEnd::Disconnect => {
                    active = false;
                    continue;
                }
                WaitEnd::Shutdown => break,
            }

            handler(TransportSignal::ReconnectAttempt { attempt });
        }

        debug!("Transport event loop terminated");
    }

    /// Sleeps for `delay`, staying responsive to commands.
    async fn wait_backoff(
        delay: Duration,
        command_rx: &mut mpsc::UnboundedReceiver<TransportCommand>,
    ) -> WaitEnd {
        let wait = sleep(delay);
        tokio::pin!(wait);

        loop {
            tokio::select! {
                () = &mut wait => return WaitEnd::Elapsed,

                command = command_rx.recv() => match command {
                    Some(TransportCommand::Emit(_)) => {
                        debug!("Reconnecting, outbound frame dropped");
                    }
                    Some(TransportCommand::Reconnect) => return WaitEnd::Reconnect,
                    Some(TransportCommand::Disconnect) => return WaitEnd::Disconnect,
                    None => return WaitEnd::Shutdown,
                },
            }
        }
    }

    /// Connects, then runs the session until it ends.
    ///
    /// `Err` means the attempt failed before a session existed.
    async fn run_attempt(
        config: &LoopConfig,
        command_rx: &mut mpsc::UnboundedReceiver<TransportCommand>,
        handler: &SignalHandler,
    ) -> Result<SessionEnd> {
        let connect = Self::connect(config);
        tokio::pin!(connect);

        // Commands issued while connecting are not queued.
        let (ws_stream, handshake) = loop {
            tokio::select! {
                result = &mut connect => break result?,

                command = command_rx.recv() => match command {
                    Some(TransportCommand::Emit(_)) => {
                        debug!("Still connecting, outbound frame dropped");
                    }
                    Some(TransportCommand::Reconnect) => {}
                    Some(TransportCommand::Disconnect) => {
                        debug!("Connection attempt cancelled");
                        return Ok(SessionEnd::ClientDisconnect);
                    }
                    None => return Ok(SessionEnd::Shutdown),
                },
            }
        };

        handler(TransportSignal::Connect);

        let end = Self::run_session(ws_stream, &handshake, command_rx, handler).await;

        if matches!(end, SessionEnd::ClientDisconnect) {
            info!("Disconnected from game server on request");
            handler(TransportSignal::Disconnect {
                reason: REASON_CLIENT_DISCONNECT.to_string(),
            });
        }

        Ok(end)
    }

    /// Opens the WebSocket and completes the handshake within the timeout.
    async fn connect(config: &LoopConfig) -> Result<(WsStream, Handshake)> {
        let timeout_ms = config.connect_timeout.as_millis() as u64;

        timeout(config.connect_timeout, Self::handshake(&config.url))
            .await
            .map_err(|_| Error::connection_timeout(timeout_ms))?
    }

    /// Engine.IO open, then Socket.IO connect.
    async fn handshake(url: &Url) -> Result<(WsStream, Handshake)> {
        debug!(%url, "Opening WebSocket");

        let (mut ws_stream, _) = connect_async(url.as_str()).await?;

        let handshake = match Self::next_packet(&mut ws_stream).await? {
            Packet::Open(handshake) => handshake,
            other => {
                return Err(Error::protocol(format!(
                    "expected open packet, got {other:?}"
                )));
            }
        };

        trace!(sid = %handshake.sid, "Engine.IO open received");

        let connect = Packet::Connect { sid: None }.encode()?;
        ws_stream.send(Message::Text(connect.into())).await?;

        loop {
            match Self::next_packet(&mut ws_stream).await? {
                Packet::Connect { sid } => {
                    info!(
                        engine_sid = %handshake.sid,
                        socket_sid = sid.as_deref().unwrap_or_default(),
                        "Connected to game server"
                    );
                    return Ok((ws_stream, handshake));
                }
                Packet::ConnectError { message } => return Err(Error::connection(message)),
                Packet::Ping => {
                    let pong = Packet::Pong.encode()?;
                    ws_stream.send(Message::Text(pong.into())).await?;
                }
                other => trace!(?other, "Ignoring packet before connect ack"),
            }
        }
    }

    /// Reads the next text frame and decodes it.
    async fn next_packet(ws_stream: &mut WsStream) -> Result<Packet> {
        loop {
            match ws_stream.next().await {
                Some(Ok(Message::Text(text))) => return Packet::decode(&text),
                Some(Ok(Message::Close(_))) | None => return Err(Error::ConnectionClosed),
                Some(Err(e)) => return Err(e.into()),
                // Ignore Binary, Ping, Pong
                Some(Ok(_)) => {}
            }
        }
    }

    /// Runs one live session until it ends.
    async fn run_session(
        ws_stream: WsStream,
        handshake: &Handshake,
        command_rx: &mut mpsc::UnboundedReceiver<TransportCommand>,
        handler: &SignalHandler,
    ) -> SessionEnd {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let heartbeat = handshake.heartbeat_deadline();
        let deadline = sleep(heartbeat);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                // Incoming frames from the server
                message = ws_read.next() => {
                    match Self::handle_incoming(message, &mut ws_write, handler).await {
                        Incoming::Continue => {}
                        Incoming::Ping => deadline.as_mut().reset(Instant::now() + heartbeat),
                        Incoming::End(end) => return end,
                    }
                }

                // Commands from the connector
                command = command_rx.recv() => match command {
                    Some(TransportCommand::Emit(frame)) => {
                        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                            warn!(error = %e, "Failed to send frame");
                            return SessionEnd::Lost(REASON_TRANSPORT_ERROR);
                        }
                        trace!("Frame sent");
                    }
                    Some(TransportCommand::Disconnect) => {
                        Self::close(&mut ws_write, true).await;
                        return SessionEnd::ClientDisconnect;
                    }
                    Some(TransportCommand::Reconnect) => {
                        trace!("Already connected");
                    }
                    None => {
                        Self::close(&mut ws_write, true).await;
                        return SessionEnd::Shutdown;
                    }
                },

                // Heartbeat watchdog, pushed forward by every ping
                () = &mut deadline => {
                    warn!(timeout_ms = heartbeat.as_millis() as u64, "No ping from server");
                    Self::close(&mut ws_write, false).await;
                    return SessionEnd::Lost(REASON_PING_TIMEOUT);
                }
            }
        }
    }

    /// Handles one item from the read half.
    async fn handle_incoming(
        message: Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>,
        ws_write: &mut WsWrite,
        handler: &SignalHandler,
    ) -> Incoming {
        match message {
            Some(Ok(Message::Text(text))) => match Packet::decode(&text) {
                Ok(Packet::Ping) => {
                    let pong = match Packet::Pong.encode() {
                        Ok(pong) => pong,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode pong");
                            return Incoming::Ping;
                        }
                    };
                    if let Err(e) = ws_write.send(Message::Text(pong.into())).await {
                        warn!(error = %e, "Failed to answer ping");
                        return Incoming::End(SessionEnd::Lost(REASON_TRANSPORT_ERROR));
                    }
                    Incoming::Ping
                }
                Ok(Packet::Event { name, payload }) => {
                    trace!(event = %name, "Event received");
                    handler(TransportSignal::Message {
                        event: name,
                        payload,
                    });
                    Incoming::Continue
                }
                Ok(Packet::Disconnect) => Incoming::End(SessionEnd::Lost(REASON_SERVER_DISCONNECT)),
                Ok(Packet::Close) => Incoming::End(SessionEnd::Lost(REASON_TRANSPORT_CLOSE)),
                Ok(other) => {
                    trace!(?other, "Ignoring packet");
                    Incoming::Continue
                }
                Err(e) => {
                    warn!(error = %e, "Failed to decode frame");
                    Incoming::Continue
                }
            },

            Some(Ok(Message::Close(_))) | None => {
                debug!("WebSocket closed by server");
                Incoming::End(SessionEnd::Lost(REASON_TRANSPORT_CLOSE))
            }

            Some(Err(e)) => {
                warn!(error = %e, "WebSocket error");
                Incoming::End(SessionEnd::Lost(REASON_TRANSPORT_ERROR))
            }

            // Ignore Binary, Ping, Pong
            Some(Ok(_)) => Incoming::Continue,
        }
    }

    /// Best-effort close of the write half.
    async fn close(ws_write: &mut WsWrite, announce: bool) {
        if announce
            && let Ok(frame) = Packet::Disconnect.encode()
            && let Err(e) = ws_write.send(Message::Text(frame.into())).await
        {
            trace!(error = %e, "Failed to announce disconnect");
        }
        let _ = ws_write.close().await;
    }
}

impl Transport for WebSocketTransport {
    fn emit(&self, event: &str, payload: &Value) -> Result<()> {
        let frame = Packet::event(event, payload.clone()).encode()?;
        self.command_tx
            .send(TransportCommand::Emit(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn disconnect(&self) {
        let _ = self.command_tx.send(TransportCommand::Disconnect);
    }

    fn reconnect(&self) {
        let _ = self.command_tx.send(TransportCommand::Reconnect);
    }
}

// ============================================================================
// WebSocketFactory
// ============================================================================

/// Opens [`WebSocketTransport`]s on the current tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketFactory;

impl TransportFactory for WebSocketFactory {
    fn open(
        &self,
        options: &ConnectorOptions,
        handler: SignalHandler,
    ) -> Result<Box<dyn Transport>> {
        Ok(Box::new(WebSocketTransport::spawn(options, handler)?))
    }
}

// ============================================================================
// Tests
// ============================================================================

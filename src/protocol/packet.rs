//! Engine.IO v4 / Socket.IO v5 text frame codec.
//!
//! Every WebSocket text frame carries one Engine.IO packet. Message packets
//! (`4`) wrap a Socket.IO packet:
//!
//! | Frame | Meaning |
//! |-------|---------|
//! | `0{"sid":…,"pingInterval":…}` | Engine.IO open handshake |
//! | `2` / `3` | ping / pong |
//! | `40` / `40{"sid":…}` | Socket.IO connect (request / ack) |
//! | `41` | Socket.IO disconnect |
//! | `42["name",{…}]` | Socket.IO event |
//! | `44{"message":…}` | Socket.IO connect error |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, from_str, to_string};

use crate::error::{Error, Result};

// ============================================================================
// Handshake
// ============================================================================

/// Engine.IO open handshake sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session ID.
    pub sid: String,

    /// Milliseconds between server pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,

    /// Milliseconds the server waits for a pong.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl Handshake {
    /// How long the session may stay silent before it counts as lost.
    #[inline]
    #[must_use]
    pub fn heartbeat_deadline(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

// ============================================================================
// Packet
// ============================================================================

/// A decoded frame, flattened across the Engine.IO and Socket.IO layers.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO open.
    Open(Handshake),
    /// Engine.IO close.
    Close,
    /// Engine.IO ping.
    Ping,
    /// Engine.IO pong.
    Pong,
    /// Engine.IO noop.
    Noop,
    /// Socket.IO connect. Carries the socket ID on the server's ack.
    Connect {
        /// Socket ID, absent on the client's request.
        sid: Option<String>,
    },
    /// Socket.IO disconnect.
    Disconnect,
    /// Socket.IO event.
    Event {
        /// Wire event name.
        name: String,
        /// First event argument, `Null` if absent.
        payload: Value,
    },
    /// Socket.IO connect refusal.
    ConnectError {
        /// Reason given by the server.
        message: String,
    },
}

impl Packet {
    /// Creates an event packet.
    #[inline]
    #[must_use]
    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        Self::Event {
            name: name.into(),
            payload,
        }
    }

    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] on unknown packet types or binary packets
    /// - [`Error::Json`] if a JSON body is malformed
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::protocol("empty frame"))?;
        let body = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(from_str(body)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Self::decode_socket(body),
            '6' => Ok(Self::Noop),
            other => Err(Error::protocol(format!(
                "unsupported engine packet type '{other}'"
            ))),
        }
    }

    /// Decodes the Socket.IO packet inside an Engine.IO message.
    fn decode_socket(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::protocol("empty socket packet"))?;
        let rest = skip_ack_id(skip_namespace(chars.as_str()));

        match kind {
            '0' => {
                let sid = if rest.is_empty() {
                    None
                } else {
                    from_str::<Value>(rest)?
                        .get("sid")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                };
                Ok(Self::Connect { sid })
            }
            '1' => Ok(Self::Disconnect),
            '2' => Self::decode_event(rest),
            '4' => {
                let value: Value = if rest.is_empty() {
                    Value::Null
                } else {
                    from_str(rest)?
                };
                let message = match &value {
                    Value::String(s) => s.clone(),
                    other => other
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("connection refused")
                        .to_string(),
                };
                Ok(Self::ConnectError { message })
            }
            '5' | '6' => Err(Error::protocol("binary packets are not supported")),
            other => Err(Error::protocol(format!(
                "unsupported socket packet type '{other}'"
            ))),
        }
    }

    /// Decodes `["name", arg, …]`.
    fn decode_event(body: &str) -> Result<Self> {
        let Value::Array(mut args) = from_str::<Value>(body)? else {
            return Err(Error::protocol("event body is not an array"));
        };

        if args.is_empty() {
            return Err(Error::protocol("event without a name"));
        }

        let Value::String(name) = args.remove(0) else {
            return Err(Error::protocol("event name is not a string"));
        };

        let payload = if args.is_empty() {
            Value::Null
        } else {
            args.swap_remove(0)
        };

        Ok(Self::Event { name, payload })
    }

    /// Encodes the packet as a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] for server-only packets (`Open`)
    /// - [`Error::Json`] if the payload cannot be serialized
    pub fn encode(&self) -> Result<String> {
        match self {
            Self::Open(_) => Err(Error::protocol("open packets are server-only")),
            Self::Close => Ok("1".to_string()),
            Self::Ping => Ok("2".to_string()),
            Self::Pong => Ok("3".to_string()),
            Self::Noop => Ok("6".to_string()),
            Self::Connect { sid: None } => Ok("40".to_string()),
            Self::Connect { sid: Some(sid) } => {
                Ok(format!("40{}", to_string(&serde_json::json!({ "sid": sid }))?))
            }
            Self::Disconnect => Ok("41".to_string()),
            Self::Event { name, payload } => {
                let body = to_string(&[Value::String(name.clone()), payload.clone()])?;
                Ok(format!("42{body}"))
            }
            Self::ConnectError { message } => {
                Ok(format!("44{}", to_string(&serde_json::json!({ "message": message }))?))
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Skips a `/namespace,` prefix.
#[inline]
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

/// Skips leading ack ID digits.
#[inline]
fn skip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

// ============================================================================
// Tests
// ============================================================================

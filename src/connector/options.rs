//! Connector configuration.
//!
//! Controls where the connector connects and how the transport retries
//! after losing the server.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use party_connector::ConnectorOptions;
//!
//! let options = ConnectorOptions::new()
//!     .with_endpoint("http://192.168.1.20:13370")
//!     .with_reconnection_attempts(10)
//!     .with_reconnection_delay(Duration::from_millis(500));
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Server origin used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:13370";

/// Socket.IO mount path on the server.
pub const DEFAULT_PATH: &str = "/socket.io/";

/// Engine.IO protocol revision spoken by the transport.
const ENGINE_IO_VERSION: &str = "4";

// ============================================================================
// ConnectorOptions
// ============================================================================

/// Connection and reconnection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorOptions {
    /// Server origin (`http`, `https`, `ws` or `wss`). `None` uses [`DEFAULT_ENDPOINT`].
    pub endpoint: Option<String>,

    /// Socket.IO mount path.
    pub path: String,

    /// Reconnect automatically after the session is lost.
    pub reconnection: bool,

    /// Maximum reconnection attempts. `None` retries forever.
    pub reconnection_attempts: Option<u32>,

    /// Base delay between reconnection attempts.
    pub reconnection_delay: Duration,

    /// Upper bound for the backoff delay.
    pub reconnection_delay_max: Duration,

    /// Time allowed for one connection handshake.
    pub connect_timeout: Duration,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectorOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: None,
            path: DEFAULT_PATH.to_string(),
            reconnection: true,
            reconnection_attempts: None,
            reconnection_delay: Duration::from_millis(1000),
            reconnection_delay_max: Duration::from_millis(5000),
            connect_timeout: Duration::from_millis(20_000),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectorOptions {
    /// Sets the server origin.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the Socket.IO mount path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn with_reconnection(mut self, enabled: bool) -> Self {
        self.reconnection = enabled;
        self
    }

    /// Bounds the number of reconnection attempts.
    #[inline]
    #[must_use]
    pub fn with_reconnection_attempts(mut self, attempts: u32) -> Self {
        self.reconnection_attempts = Some(attempts);
        self
    }

    /// Retries forever.
    #[inline]
    #[must_use]
    pub fn with_unbounded_reconnection(mut self) -> Self {
        self.reconnection_attempts = None;
        self
    }

    /// Sets the base reconnection delay.
    #[inline]
    #[must_use]
    pub fn with_reconnection_delay(mut self, delay: Duration) -> Self {
        self.reconnection_delay = delay;
        self
    }

    /// Sets the reconnection delay cap.
    #[inline]
    #[must_use]
    pub fn with_reconnection_delay_max(mut self, delay: Duration) -> Self {
        self.reconnection_delay_max = delay;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl ConnectorOptions {
    /// Returns the configured origin or [`DEFAULT_ENDPOINT`].
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Builds the WebSocket URL for the Socket.IO handshake.
    ///
    /// `http://host:13370` becomes
    /// `ws://host:13370/socket.io/?EIO=4&transport=websocket`.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the endpoint does not parse
    /// - [`Error::Config`] if the scheme is not HTTP or WebSocket
    pub fn endpoint_url(&self) -> Result<Url> {
        let mut url = Url::parse(self.endpoint())?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(Error::config(format!(
                    "unsupported endpoint scheme '{other}'"
                )));
            }
        };

        url.set_scheme(scheme)
            .map_err(|()| Error::config(format!("cannot use scheme '{scheme}'")))?;
        url.set_path(&self.path);
        url.query_pairs_mut()
            .clear()
            .append_pair("EIO", ENGINE_IO_VERSION)
            .append_pair("transport", "websocket");

        Ok(url)
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] or [`Error::Url`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.reconnection_delay.is_zero() {
            return Err(Error::config("reconnection delay must be greater than zero"));
        }

        if self.reconnection_delay_max < self.reconnection_delay {
            return Err(Error::config(
                "reconnection delay cap must not be below the base delay",
            ));
        }

        if self.reconnection_attempts == Some(0) {
            return Err(Error::config(
                "reconnection attempts must be at least one, or unbounded",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect timeout must be greater than zero"));
        }

        self.endpoint_url()?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConnectorOptions::default();
        assert_eq!(options.endpoint(), DEFAULT_ENDPOINT);
        assert!(options.reconnection);
        assert_eq!(options.reconnection_attempts, None);
        assert_eq!(options.reconnection_delay, Duration::from_secs(1));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = ConnectorOptions::new()
            .with_endpoint("https://party.example")
            .with_reconnection(false)
            .with_reconnection_attempts(3)
            .with_connect_timeout(Duration::from_secs(5));

        assert_eq!(options.endpoint(), "https://party.example");
        assert!(!options.reconnection);
        assert_eq!(options.reconnection_attempts, Some(3));

        let options = options.with_unbounded_reconnection();
        assert_eq!(options.reconnection_attempts, None);
    }

    #[test]
    fn test_endpoint_url_default() {
        let url = ConnectorOptions::new().endpoint_url().expect("valid url");
        assert_eq!(
            url.as_str(),
            "ws://127.0.0.1:13370/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_endpoint_url_secure() {
        let url = ConnectorOptions::new()
            .with_endpoint("https://party.example/ignored?x=1")
            .endpoint_url()
            .expect("valid url");
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/socket.io/");
        assert_eq!(url.query(), Some("EIO=4&transport=websocket"));
    }

    #[test]
    fn test_endpoint_url_rejects_other_schemes() {
        let err = ConnectorOptions::new()
            .with_endpoint("ftp://party.example")
            .endpoint_url()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = ConnectorOptions::new()
            .with_endpoint("not a url")
            .endpoint_url()
            .unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_validate() {
        let options = ConnectorOptions::new().with_reconnection_delay(Duration::ZERO);
        assert!(options.validate().is_err());

        let options = ConnectorOptions::new()
            .with_reconnection_delay(Duration::from_secs(10))
            .with_reconnection_delay_max(Duration::from_secs(1));
        assert!(options.validate().is_err());

        let options = ConnectorOptions::new().with_reconnection_attempts(0);
        assert!(options.validate().is_err());

        let options = ConnectorOptions::new().with_connect_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }
}

//! Client builder and streaming loop.
//!
//! The [`ClientBuilder`] collects session settings and validates the login.
//! The [`StreamClient`] then runs one session:
//! 1. Create and initialize the connection
//! 2. Connect (TLS first, plaintext per [`TlsFallback`])
//! 3. Send the login record
//! 4. Decode frames and write them to the sink until the first error
//!
//! # Example
//!
//! ```ignore
//! use camwire_client::{ClientBuilder, Variant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("192.168.1.20", "12345678")
//!         .variant(Variant::SignatureScan)
//!         .build()?;
//!
//!     let mut stdout = tokio::io::stdout();
//!     if let Err(e) = client.run(&mut stdout).await {
//!         eprintln!("stream ended: {e}");
//!     }
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::control::send_login;
use crate::decoder::{DecoderConfig, FrameDecoder, MarkerScan, Variant};
use crate::error::{CamwireError, Result};
use crate::protocol::{LoginRequest, DEFAULT_IDENTIFIER, DEFAULT_PORT};
use crate::transport::{
    timeout_from_millis, Connection, TlsFallback, TlsVerification, Transport, TransportConfig,
};

/// Default per-receive timeout in milliseconds (0 = wait forever).
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 0;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_identifier() -> String {
    DEFAULT_IDENTIFIER.to_string()
}

fn default_attempt_secure() -> bool {
    true
}

/// Serializable session settings.
///
/// Only `host` and `access_code` are required when loading from JSON.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Device host name or address.
    pub host: String,
    /// Access credential printed on the device.
    pub access_code: String,
    /// Device port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Client identifier sent in the login record.
    #[serde(default = "default_identifier")]
    pub identifier: String,
    /// Stream framing.
    #[serde(default)]
    pub variant: Variant,
    /// Try TLS before plaintext.
    #[serde(default = "default_attempt_secure")]
    pub attempt_secure: bool,
    /// Behaviour when TLS fails.
    #[serde(default)]
    pub tls_fallback: TlsFallback,
    /// Start-marker search mode.
    #[serde(default)]
    pub marker_scan: MarkerScan,
    /// Cap on length-prefixed payloads.
    #[serde(default)]
    pub max_payload: Option<u32>,
    /// Per-receive timeout in milliseconds, 0 waits forever.
    #[serde(default)]
    pub receive_timeout_ms: u64,
}

impl StreamConfig {
    /// Settings with defaults for everything except host and credential.
    pub fn new(host: impl Into<String>, access_code: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            access_code: access_code.into(),
            port: DEFAULT_PORT,
            identifier: default_identifier(),
            variant: Variant::default(),
            attempt_secure: true,
            tls_fallback: TlsFallback::default(),
            marker_scan: MarkerScan::default(),
            max_payload: None,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
        }
    }

    /// Parse settings from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decoder settings derived from this config.
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            marker_scan: self.marker_scan,
            max_payload: self.max_payload,
            receive_timeout: timeout_from_millis(self.receive_timeout_ms),
        }
    }
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("host", &self.host)
            .field("access_code", &"<redacted>")
            .field("port", &self.port)
            .field("identifier", &self.identifier)
            .field("variant", &self.variant)
            .field("attempt_secure", &self.attempt_secure)
            .field("tls_fallback", &self.tls_fallback)
            .field("marker_scan", &self.marker_scan)
            .field("max_payload", &self.max_payload)
            .field("receive_timeout_ms", &self.receive_timeout_ms)
            .finish()
    }
}

/// Builder for configuring and creating a [`StreamClient`].
pub struct ClientBuilder {
    config: StreamConfig,
    tls_verification: TlsVerification,
}

impl ClientBuilder {
    /// Create a builder for `host` with the given access code.
    pub fn new(host: impl Into<String>, access_code: impl Into<String>) -> Self {
        Self::from_config(StreamConfig::new(host, access_code))
    }

    /// Start from loaded settings.
    pub fn from_config(config: StreamConfig) -> Self {
        Self {
            config,
            tls_verification: TlsVerification::default(),
        }
    }

    /// Set the device port.
    ///
    /// Default: 6000
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the login identifier.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.config.identifier = identifier.into();
        self
    }

    /// Select the stream framing.
    pub fn variant(mut self, variant: Variant) -> Self {
        self.config.variant = variant;
        self
    }

    /// Whether to attempt TLS at all.
    ///
    /// Default: true
    pub fn attempt_secure(mut self, attempt: bool) -> Self {
        self.config.attempt_secure = attempt;
        self
    }

    /// Set the TLS failure policy.
    ///
    /// Default: [`TlsFallback::Plaintext`]
    pub fn tls_fallback(mut self, fallback: TlsFallback) -> Self {
        self.config.tls_fallback = fallback;
        self
    }

    /// Set how the server certificate is checked.
    ///
    /// Default: [`TlsVerification::AcceptAny`]
    pub fn tls_verification(mut self, verification: TlsVerification) -> Self {
        self.tls_verification = verification;
        self
    }

    /// Set the start-marker search mode.
    pub fn marker_scan(mut self, scan: MarkerScan) -> Self {
        self.config.marker_scan = scan;
        self
    }

    /// Reject length-prefixed payloads above `max` bytes.
    pub fn max_payload(mut self, max: u32) -> Self {
        self.config.max_payload = Some(max);
        self
    }

    /// Set the per-receive timeout. `Duration::ZERO` waits forever.
    ///
    /// Non-zero durations are rounded up to whole milliseconds; the TLS
    /// handshake uses the same limit.
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.receive_timeout_ms = if timeout.is_zero() {
            0
        } else {
            timeout.as_millis().max(1).try_into().unwrap_or(u64::MAX)
        };
        self
    }

    /// Validate the login fields and build the client.
    pub fn build(self) -> Result<StreamClient> {
        let login = LoginRequest::with_identifier(&self.config.identifier, &self.config.access_code)?;
        Ok(StreamClient {
            transport: TransportConfig {
                tls_fallback: self.config.tls_fallback,
                tls_verification: self.tls_verification,
                handshake_timeout: timeout_from_millis(self.config.receive_timeout_ms),
            },
            config: self.config,
            login,
        })
    }
}

/// A configured streaming session.
pub struct StreamClient {
    config: StreamConfig,
    login: LoginRequest,
    transport: TransportConfig,
}

impl StreamClient {
    /// Create a new client builder.
    pub fn builder(host: impl Into<String>, access_code: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(host, access_code)
    }

    /// Session settings.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Create, initialize, and connect a connection for this session.
    pub async fn connect(&self) -> Result<Connection> {
        let mut conn = Connection::new(self.transport.clone());
        conn.initialize()?;
        conn.connect(&self.config.host, self.config.port, self.config.attempt_secure)
            .await?;
        Ok(conn)
    }

    /// Run one session, writing frames to `sink` until the first error.
    ///
    /// The connection is closed before the error is returned. There is no
    /// reconnect.
    pub async fn run<W: AsyncWrite + Unpin>(&self, sink: &mut W) -> Result<Infallible> {
        info!(
            host = %self.config.host,
            port = self.config.port,
            variant = ?self.config.variant,
            "starting session"
        );
        let mut conn = self.connect().await?;

        let err = match self.stream(&mut conn, sink).await {
            Ok(never) => match never {},
            Err(e) => e,
        };

        if let Err(close_err) = conn.close().await {
            debug!(error = %close_err, "close after session end failed");
        }
        Err(err)
    }

    /// Login and pump frames over an already-connected transport.
    pub async fn stream<T: Transport, W: AsyncWrite + Unpin>(
        &self,
        transport: &mut T,
        sink: &mut W,
    ) -> Result<Infallible> {
        send_login(transport, &self.login).await?;
        let mut decoder = FrameDecoder::new(self.config.variant, &self.config.decoder_config());
        pump(transport, &mut decoder, sink).await
    }
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames written to the sink.
    pub frames: u64,
    /// Bytes written to the sink.
    pub bytes: u64,
}

/// Decode frames and write each one to `sink`, flushing after every frame.
///
/// Returns on the first decoder or sink error.
pub async fn pump<T: Transport, W: AsyncWrite + Unpin>(
    transport: &mut T,
    decoder: &mut FrameDecoder,
    sink: &mut W,
) -> Result<Infallible> {
    let mut stats = SessionStats::default();
    loop {
        let result = match decoder.next_frame(transport).await {
            Ok(frame) => write_frame(sink, frame.payload()).await.map(|()| frame.len()),
            Err(e) => Err(e),
        };

        match result {
            Ok(len) => {
                stats.frames += 1;
                stats.bytes += len as u64;
            }
            Err(e) => {
                warn!(
                    frames = stats.frames,
                    bytes = stats.bytes,
                    error = %e,
                    "stream ended"
                );
                return Err(e);
            }
        }
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(sink: &mut W, bytes: &[u8]) -> Result<()> {
    sink.write_all(bytes).await.map_err(CamwireError::Sink)?;
    sink.flush().await.map_err(CamwireError::Sink)
}

/// Connect, log in, and stream frames from `host` on the default port.
///
/// Shorthand for [`ClientBuilder`] with every other setting at its default.
pub async fn run<W: AsyncWrite + Unpin>(
    host: &str,
    access_code: &str,
    variant: Variant,
    sink: &mut W,
) -> Result<Infallible> {
    ClientBuilder::new(host, access_code)
        .variant(variant)
        .build()?
        .run(sink)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FrameHeader, START_MARKER};
    use crate::transport::scripted::ScriptedTransport;

    #[test]
    fn test_builder_defaults() {
        let client = ClientBuilder::new("printer.local", "12345678").build().unwrap();
        let config = client.config();

        assert_eq!(config.port, 6000);
        assert_eq!(config.identifier, "bblp");
        assert_eq!(config.variant, Variant::SignatureScan);
        assert!(config.attempt_secure);
        assert_eq!(config.tls_fallback, TlsFallback::Plaintext);
        assert_eq!(config.marker_scan, MarkerScan::PerChunk);
        assert_eq!(config.max_payload, None);
        assert_eq!(config.decoder_config().receive_timeout, None);
    }

    #[test]
    fn test_builder_configuration() {
        let client = StreamClient::builder("10.0.0.2", "code")
            .port(7000)
            .variant(Variant::LengthPrefixed)
            .attempt_secure(false)
            .tls_fallback(TlsFallback::Abort)
            .marker_scan(MarkerScan::RollingWindow)
            .max_payload(1 << 20)
            .receive_timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        let config = client.config();

        assert_eq!(config.port, 7000);
        assert_eq!(config.variant, Variant::LengthPrefixed);
        assert!(!config.attempt_secure);
        assert_eq!(config.tls_fallback, TlsFallback::Abort);
        assert_eq!(config.max_payload, Some(1 << 20));
        assert_eq!(
            config.decoder_config().receive_timeout,
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_sub_millisecond_timeout_is_not_infinite() {
        let client = ClientBuilder::new("h", "c")
            .receive_timeout(Duration::from_micros(500))
            .build()
            .unwrap();

        assert_eq!(client.config().receive_timeout_ms, 1);
        assert_eq!(
            client.config().decoder_config().receive_timeout,
            Some(Duration::from_millis(1))
        );
    }

    #[test]
    fn test_zero_timeout_waits_forever() {
        let client = ClientBuilder::new("h", "c")
            .receive_timeout(Duration::ZERO)
            .build()
            .unwrap();

        assert_eq!(client.config().decoder_config().receive_timeout, None);
        assert_eq!(client.transport.handshake_timeout, None);
    }

    #[test]
    fn test_receive_timeout_bounds_tls_handshake() {
        let client = ClientBuilder::new("h", "c")
            .receive_timeout(Duration::from_millis(250))
            .build()
            .unwrap();

        assert_eq!(
            client.transport.handshake_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_build_rejects_overlong_code() {
        let err = ClientBuilder::new("host", "x".repeat(64)).build().err().unwrap();
        assert!(matches!(err, CamwireError::CredentialTooLong { len: 64, .. }));
    }

    #[test]
    fn test_config_from_json_minimal() {
        let config =
            StreamConfig::from_json(r#"{"host": "192.168.1.5", "access_code": "abcd"}"#).unwrap();
        assert_eq!(config, StreamConfig::new("192.168.1.5", "abcd"));
    }

    #[test]
    fn test_config_from_json_full() {
        let config = StreamConfig::from_json(
            r#"{
                "host": "cam",
                "access_code": "abcd",
                "port": 6001,
                "variant": "length_prefixed",
                "attempt_secure": false,
                "tls_fallback": "abort",
                "max_payload": 4096,
                "receive_timeout_ms": 1500
            }"#,
        )
        .unwrap();

        assert_eq!(config.port, 6001);
        assert_eq!(config.variant, Variant::LengthPrefixed);
        assert_eq!(config.tls_fallback, TlsFallback::Abort);
        assert_eq!(config.max_payload, Some(4096));
        assert_eq!(
            config.decoder_config().receive_timeout,
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_config_from_json_missing_host() {
        let err = StreamConfig::from_json(r#"{"access_code": "abcd"}"#).unwrap_err();
        assert!(matches!(err, CamwireError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_access_code() {
        let rendered = format!("{:?}", StreamConfig::new("cam", "supersecret"));
        assert!(!rendered.contains("supersecret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_stream_logs_in_then_forwards_frames() {
        let client = ClientBuilder::new("cam", "pw").build().unwrap();
        let mut t = ScriptedTransport::new()
            .data([b"noise".as_slice(), &START_MARKER, b"img"].concat())
            .data(b"more");
        let mut sink = Vec::new();

        let err = client.stream(&mut t, &mut sink).await.unwrap_err();

        assert!(matches!(err, CamwireError::ConnectionClosed));
        assert_eq!(t.sent.len(), 1);
        assert_eq!(&t.sent[0][48..50], b"pw");
        assert_eq!(sink, [START_MARKER.as_slice(), b"img", b"more"].concat());
    }

    #[tokio::test]
    async fn test_pump_stops_writing_after_failure() {
        let mut t = ScriptedTransport::new()
            .data(FrameHeader::new(2).encode())
            .data(b"ok")
            .data(FrameHeader::new(3).encode())
            .fail()
            .data(b"late");
        let mut decoder = FrameDecoder::new(Variant::LengthPrefixed, &DecoderConfig::default());
        let mut sink = Vec::new();

        let err = pump(&mut t, &mut decoder, &mut sink).await.unwrap_err();

        assert!(matches!(err, CamwireError::Io(_)));
        assert_eq!(sink, b"ok");
    }

    #[tokio::test]
    async fn test_pump_sink_failure_is_fatal() {
        struct BrokenSink;

        impl AsyncWrite for BrokenSink {
            fn poll_write(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &[u8],
            ) -> std::task::Poll<std::io::Result<usize>> {
                std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
            }

            fn poll_flush(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }

            fn poll_shutdown(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }
        }

        let mut t = ScriptedTransport::new().data(START_MARKER).data(b"more");
        let mut decoder = FrameDecoder::new(Variant::SignatureScan, &DecoderConfig::default());

        let err = pump(&mut t, &mut decoder, &mut BrokenSink).await.unwrap_err();

        assert!(matches!(err, CamwireError::Sink(_)));
        assert_eq!(t.receive_calls, 1);
    }
}

//! Connection lifecycle: create, initialize, connect, send, receive, close.
//!
//! A [`Connection`] is owned by exactly one session. [`Connection::close`]
//! consumes it, so it can only be closed once.

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

use super::tls::{build_client_config, TlsFallback, TlsVerification};
use super::Transport;
use crate::error::{CamwireError, ErrorLocation, Result, TransportErrorKind};

/// Transport settings for one connection.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// Behaviour when the TLS handshake fails.
    pub tls_fallback: TlsFallback,
    /// Server certificate checking.
    pub tls_verification: TlsVerification,
    /// Limit on the TLS handshake; `None` waits indefinitely.
    ///
    /// An elapsed handshake fails with [`CamwireError::Timeout`] whatever the
    /// fallback policy, since the half-negotiated stream cannot be reused.
    pub handshake_timeout: Option<Duration>,
}

/// The active byte channel.
enum Channel {
    Plain(TcpStream),
    Secure(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Channel {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Channel::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Channel::Secure(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Channel {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Channel::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Channel::Secure(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Channel::Plain(s) => Pin::new(s).poll_flush(cx),
            Channel::Secure(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Channel::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Channel::Secure(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Stream connection to a device, optionally secured with TLS.
pub struct Connection {
    config: TransportConfig,
    socket: Option<TcpSocket>,
    tls: Option<TlsConnector>,
    channel: Option<Channel>,
    peer: Option<SocketAddr>,
}

impl Connection {
    /// Create an unconnected connection.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            socket: None,
            tls: None,
            channel: None,
            peer: None,
        }
    }

    /// Prepare the IPv4 stream socket and the TLS client context.
    pub fn initialize(&mut self) -> Result<()> {
        let socket = TcpSocket::new_v4().map_err(|e| {
            CamwireError::transport(
                TransportErrorKind::CreateFailed,
                ErrorLocation::StreamProtocol,
                e,
            )
        })?;
        let tls_config = build_client_config(&self.config.tls_verification)?;

        self.socket = Some(socket);
        self.tls = Some(TlsConnector::from(tls_config));
        Ok(())
    }

    /// Resolve `host`, open the stream, and optionally negotiate TLS.
    ///
    /// Initializes the connection first if [`initialize`](Self::initialize)
    /// has not been called. When `attempt_secure` is set and the handshake
    /// fails, [`TlsFallback`] decides between continuing in plaintext and
    /// failing.
    pub async fn connect(&mut self, host: &str, port: u16, attempt_secure: bool) -> Result<()> {
        if self.socket.is_none() {
            self.initialize()?;
        }
        let socket = self.socket.take().ok_or(CamwireError::NotConnected)?;

        let addr = resolve_ipv4(host, port).await?;
        let stream = socket.connect(addr).await.map_err(|e| {
            CamwireError::transport(
                TransportErrorKind::ConnectFailed,
                ErrorLocation::StreamProtocol,
                format!("{}: {}", addr, e),
            )
        })?;
        info!(%addr, "connected");

        let channel = match self.tls.clone() {
            Some(connector) if attempt_secure => {
                let handshake = negotiate_tls(connector, self.config.tls_fallback, host, stream);
                match self.config.handshake_timeout {
                    None => handshake.await?,
                    Some(limit) => tokio::time::timeout(limit, handshake)
                        .await
                        .map_err(|_| CamwireError::Timeout(limit))??,
                }
            }
            _ => Channel::Plain(stream),
        };

        self.peer = Some(addr);
        self.channel = Some(channel);
        Ok(())
    }

    /// Write all bytes over the active channel.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let channel = self.channel.as_mut().ok_or(CamwireError::NotConnected)?;
        channel.write_all(bytes).await?;
        channel.flush().await?;
        Ok(())
    }

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// `None` waits indefinitely. Returns `Ok(0)` when the peer has closed.
    pub async fn receive(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        let channel = self.channel.as_mut().ok_or(CamwireError::NotConnected)?;
        let n = match timeout {
            None => channel.read(buf).await?,
            Some(limit) => tokio::time::timeout(limit, channel.read(buf))
                .await
                .map_err(|_| CamwireError::Timeout(limit))??,
        };
        Ok(n)
    }

    /// Shut down the TLS session (if any) and the socket.
    pub async fn close(mut self) -> Result<()> {
        if let Some(mut channel) = self.channel.take() {
            channel.shutdown().await?;
            debug!(peer = ?self.peer, "connection closed");
        }
        Ok(())
    }

    /// Whether traffic is going over TLS.
    pub fn is_secure(&self) -> bool {
        matches!(self.channel, Some(Channel::Secure(_)))
    }

    /// Whether `connect` has completed.
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Transport for Connection {
    fn send(&mut self, bytes: &[u8]) -> impl std::future::Future<Output = Result<()>> + Send {
        Connection::send(self, bytes)
    }

    fn receive(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<usize>> + Send {
        Connection::receive(self, buf, timeout)
    }
}

async fn negotiate_tls(
    connector: TlsConnector,
    fallback: TlsFallback,
    host: &str,
    stream: TcpStream,
) -> Result<Channel> {
    let server_name = match ServerName::try_from(host.to_string()) {
        Ok(name) => name,
        Err(e) => return tls_failed(fallback, stream, format!("invalid server name: {}", e)),
    };

    match connector.connect(server_name, stream).into_fallible().await {
        Ok(tls) => {
            info!("TLS session established");
            Ok(Channel::Secure(Box::new(tls)))
        }
        Err((e, stream)) => tls_failed(fallback, stream, e.to_string()),
    }
}

fn tls_failed(fallback: TlsFallback, stream: TcpStream, reason: String) -> Result<Channel> {
    match fallback {
        TlsFallback::Plaintext => {
            warn!(%reason, "TLS handshake failed, continuing in plaintext");
            Ok(Channel::Plain(stream))
        }
        TlsFallback::Abort => Err(CamwireError::TlsHandshake(reason)),
    }
}

async fn resolve_ipv4(host: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs = lookup_host((host, port)).await.map_err(|e| {
        CamwireError::transport_untagged(
            TransportErrorKind::HostLookupFailed,
            format!("{}: {}", host, e),
        )
    })?;
    addrs.find(SocketAddr::is_ipv4).ok_or_else(|| {
        CamwireError::transport_untagged(
            TransportErrorKind::HostLookupFailed,
            format!("{}: no IPv4 address", host),
        )
    })
}

//! Transport module - plaintext and TLS byte streams behind one contract.
//!
//! Provides:
//! - [`Connection`]: TCP stream with an optional TLS session on top
//! - [`Transport`]: send/receive contract the handshake and decoders run over
//!
//! # Example
//!
//! ```ignore
//! use camwire_client::transport::{Connection, TransportConfig};
//!
//! let mut conn = Connection::new(TransportConfig::default());
//! conn.initialize()?;
//! conn.connect("192.168.1.20", 6000, true).await?;
//! conn.send(b"hello").await?;
//! let mut buf = [0u8; 1400];
//! let n = conn.receive(&mut buf, None).await?;
//! conn.close().await?;
//! ```

mod connection;
mod tls;

#[cfg(test)]
pub(crate) mod scripted;

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

pub use connection::{Connection, TransportConfig};
pub use tls::{TlsFallback, TlsVerification};

/// Byte channel the login handshake and frame decoders operate on.
pub trait Transport {
    /// Write all of `bytes` to the peer.
    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read up to `buf.len()` bytes.
    ///
    /// `timeout = None` blocks until data or an error is available.
    /// `Ok(0)` means nothing was read; any `Err` is fatal to the session.
    fn receive(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<usize>> + Send;
}

/// Map a millisecond timeout where 0 means "wait forever".
pub fn timeout_from_millis(millis: u64) -> Option<Duration> {
    if millis == 0 {
        None
    } else {
        Some(Duration::from_millis(millis))
    }
}

//! # camwire-client
//!
//! Rust client for the camera stream served by networked 3D printers on
//! TCP port 6000.
//!
//! The client connects (TLS first, plaintext fallback), sends a fixed
//! 80-byte login record, then forwards the image stream to any
//! [`tokio::io::AsyncWrite`] sink.
//!
//! ## Stream framings
//!
//! - **Signature scan**: unframed bytes, the image data begins at the first
//!   JPEG start marker `FF D8 FF E0`
//! - **Length prefixed**: a 16-byte header with a little-endian payload
//!   length before every image
//!
//! ## Example
//!
//! ```ignore
//! use camwire_client::{ClientBuilder, Variant};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = ClientBuilder::new("192.168.1.20", "12345678")
//!         .variant(Variant::LengthPrefixed)
//!         .build()
//!         .unwrap();
//!
//!     let mut stdout = tokio::io::stdout();
//!     if let Err(e) = client.run(&mut stdout).await {
//!         eprintln!("{e}");
//!     }
//! }
//! ```

pub mod control;
pub mod decoder;
pub mod error;
pub mod protocol;
pub mod transport;

mod client;

pub use client::{
    pump, run, ClientBuilder, SessionStats, StreamClient, StreamConfig,
    DEFAULT_RECEIVE_TIMEOUT_MS,
};
pub use decoder::{MarkerScan, Variant};
pub use error::{CamwireError, Result};
pub use transport::{TlsFallback, TlsVerification};

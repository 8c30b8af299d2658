//! Frame decoders for the two stream framings.
//!
//! - [`SignatureScanDecoder`]: skips bytes until the first JPEG start marker,
//!   then passes everything through
//! - [`LengthPrefixedDecoder`]: reads a 16-byte header, then exactly the
//!   announced payload
//!
//! A session uses exactly one of them, selected by [`Variant`].

mod length_prefixed;
mod signature;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CamwireError, Result};
use crate::protocol::Frame;
use crate::transport::Transport;

pub use length_prefixed::LengthPrefixedDecoder;
pub use signature::SignatureScanDecoder;

/// Stream framing used by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Unframed stream starting at the first JPEG marker.
    #[default]
    SignatureScan,
    /// 16-byte little-endian length header before every image.
    LengthPrefixed,
}

/// Where the signature-scan decoder looks for the start marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerScan {
    /// Within each received chunk only. A marker split across two chunks
    /// is not found.
    #[default]
    PerChunk,
    /// Across chunk boundaries, keeping the tail of the previous chunk.
    RollingWindow,
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Marker search mode for [`Variant::SignatureScan`].
    pub marker_scan: MarkerScan,
    /// Largest accepted payload for [`Variant::LengthPrefixed`]; `None` is unbounded.
    pub max_payload: Option<u32>,
    /// Per-receive timeout; `None` blocks indefinitely.
    pub receive_timeout: Option<Duration>,
}

/// The decoder selected for a session.
pub enum FrameDecoder {
    /// Decoder for [`Variant::SignatureScan`].
    SignatureScan(SignatureScanDecoder),
    /// Decoder for [`Variant::LengthPrefixed`].
    LengthPrefixed(LengthPrefixedDecoder),
}

impl FrameDecoder {
    /// Create the decoder for `variant`.
    pub fn new(variant: Variant, config: &DecoderConfig) -> Self {
        match variant {
            Variant::SignatureScan => FrameDecoder::SignatureScan(SignatureScanDecoder::new(
                config.marker_scan,
                config.receive_timeout,
            )),
            Variant::LengthPrefixed => FrameDecoder::LengthPrefixed(LengthPrefixedDecoder::new(
                config.max_payload,
                config.receive_timeout,
            )),
        }
    }

    /// Which framing this decoder handles.
    pub fn variant(&self) -> Variant {
        match self {
            FrameDecoder::SignatureScan(_) => Variant::SignatureScan,
            FrameDecoder::LengthPrefixed(_) => Variant::LengthPrefixed,
        }
    }

    /// Receive until the next frame is available.
    ///
    /// Any error is fatal for the session.
    pub async fn next_frame<T: Transport>(&mut self, transport: &mut T) -> Result<Frame> {
        match self {
            FrameDecoder::SignatureScan(d) => d.next_frame(transport).await,
            FrameDecoder::LengthPrefixed(d) => d.next_frame(transport).await,
        }
    }
}

/// Receive into `buf` until it is full.
///
/// An empty read means the peer is gone.
pub(crate) async fn receive_exact<T: Transport>(
    transport: &mut T,
    buf: &mut [u8],
    timeout: Option<Duration>,
) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = transport.receive(&mut buf[filled..], timeout).await?;
        if n == 0 {
            return Err(CamwireError::ConnectionClosed);
        }
        filled += n;
    }
    Ok(())
}

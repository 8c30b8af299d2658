//! Wire format constants and the length-prefixed frame header.
//!
//! The length-prefixed stream repeats a 16-byte header followed by the
//! payload it announces:
//! ```text
//! ┌──────────┬──────────────────────┐
//! │ Length   │ Reserved             │
//! │ 4 bytes  │ 12 bytes             │
//! │ uint32 LE│ not interpreted      │
//! └──────────┴──────────────────────┘
//! ```
//!
//! The signature-scan stream has no header at all; the image data starts at
//! the first [`START_MARKER`].

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// JPEG SOI + APP0 marker that opens the signature-scan stream.
pub const START_MARKER: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

/// Receive chunk size for the signature-scan decoder.
pub const SCAN_CHUNK_SIZE: usize = 1400;

/// Work buffer size for draining length-prefixed payloads (2 MiB).
pub const PAYLOAD_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Default device port.
pub const DEFAULT_PORT: u16 = 6000;

/// Decoded length-prefixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length in bytes.
    pub payload_length: u32,
    /// Trailing bytes, carried verbatim.
    pub reserved: [u8; HEADER_SIZE - 4],
}

impl FrameHeader {
    /// Create a header with zeroed reserved bytes.
    pub fn new(payload_length: u32) -> Self {
        Self {
            payload_length,
            reserved: [0u8; HEADER_SIZE - 4],
        }
    }

    /// Encode header to bytes (Little Endian length).
    ///
    /// # Example
    ///
    /// ```
    /// use camwire_client::protocol::FrameHeader;
    ///
    /// let bytes = FrameHeader::new(5).encode();
    /// assert_eq!(&bytes[..4], &[5, 0, 0, 0]);
    /// assert_eq!(bytes.len(), 16);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.payload_length.to_le_bytes());
        buf[4..].copy_from_slice(&self.reserved);
        buf
    }

    /// Decode header from an exactly-sized buffer.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Self {
        let mut reserved = [0u8; HEADER_SIZE - 4];
        reserved.copy_from_slice(&buf[4..]);
        Self {
            payload_length: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            reserved,
        }
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let raw: &[u8; HEADER_SIZE] = buf.get(..HEADER_SIZE)?.try_into().ok()?;
        Some(Self::from_bytes(raw))
    }
}

/// Position of the first [`START_MARKER`] in `buf`, if any.
pub fn find_start_marker(buf: &[u8]) -> Option<usize> {
    buf.windows(START_MARKER.len())
        .position(|w| w == START_MARKER)
}

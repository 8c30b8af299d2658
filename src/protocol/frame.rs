//! Decoded frame handed to the output sink.
//!
//! Uses `bytes::Bytes` so a frame can be passed along without copying.
//!
//! # Example
//!
//! ```
//! use camwire_client::protocol::Frame;
//! use bytes::Bytes;
//!
//! let frame = Frame::new(Bytes::from_static(b"\xFF\xD8\xFF\xE0"));
//! assert_eq!(frame.len(), 4);
//! assert_eq!(frame.payload(), b"\xFF\xD8\xFF\xE0");
//! ```

use bytes::Bytes;

/// One run of decoded stream bytes.
///
/// For the length-prefixed stream this is an image payload, or a piece of
/// one when the payload is larger than the work buffer. For the signature-scan
/// stream it is whatever a single receive produced after the start marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Create a frame from raw bytes (copies data).
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            payload: Bytes::copy_from_slice(data),
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the frame carries no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Consume the frame, returning its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.payload
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.payload
    }
}

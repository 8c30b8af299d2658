//! Length-prefixed decoder.
//!
//! Implements a two-state machine over the transport:
//! - `WaitingForHeader`: need 16 header bytes
//! - `Draining`: header parsed, `remaining` payload bytes still to read
//!
//! Payloads larger than [`PAYLOAD_BUFFER_SIZE`] are delivered as several
//! consecutive frames; the sink sees them in order.

use std::time::Duration;

use bytes::BytesMut;
use tracing::debug;

use super::receive_exact;
use crate::error::{CamwireError, Result};
use crate::protocol::{Frame, FrameHeader, HEADER_SIZE, PAYLOAD_BUFFER_SIZE};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy)]
enum State {
    WaitingForHeader,
    Draining { header: FrameHeader, remaining: u32 },
}

/// Decoder for the length-prefixed stream.
pub struct LengthPrefixedDecoder {
    state: State,
    max_payload: Option<u32>,
    chunk_size: usize,
    timeout: Option<Duration>,
}

impl LengthPrefixedDecoder {
    /// Create a decoder waiting for its first header.
    ///
    /// `max_payload = None` services any declared length.
    pub fn new(max_payload: Option<u32>, timeout: Option<Duration>) -> Self {
        Self {
            state: State::WaitingForHeader,
            max_payload,
            chunk_size: PAYLOAD_BUFFER_SIZE,
            timeout,
        }
    }

    /// Header of the payload currently being drained.
    pub fn current_header(&self) -> Option<FrameHeader> {
        match self.state {
            State::WaitingForHeader => None,
            State::Draining { header, .. } => Some(header),
        }
    }

    /// Read headers and payload until one chunk of payload is complete.
    pub async fn next_frame<T: Transport>(&mut self, transport: &mut T) -> Result<Frame> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    let header = self.read_header(transport).await?;
                    if header.payload_length > 0 {
                        self.state = State::Draining {
                            header,
                            remaining: header.payload_length,
                        };
                    }
                }
                State::Draining { header, remaining } => {
                    let want = (remaining as usize).min(self.chunk_size);
                    let mut buf = BytesMut::zeroed(want);
                    receive_exact(transport, &mut buf, self.timeout).await?;

                    let remaining = remaining - want as u32;
                    self.state = if remaining == 0 {
                        State::WaitingForHeader
                    } else {
                        State::Draining { header, remaining }
                    };
                    return Ok(Frame::new(buf.freeze()));
                }
            }
        }
    }

    async fn read_header<T: Transport>(&mut self, transport: &mut T) -> Result<FrameHeader> {
        let mut raw = [0u8; HEADER_SIZE];
        receive_exact(transport, &mut raw, self.timeout).await?;
        let header = FrameHeader::from_bytes(&raw);

        if let Some(max) = self.max_payload {
            if header.payload_length > max {
                return Err(CamwireError::PayloadTooLarge {
                    len: header.payload_length,
                    max,
                });
            }
        }

        debug!(payload_length = header.payload_length, "frame header");
        Ok(header)
    }

    #[cfg(test)]
    fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

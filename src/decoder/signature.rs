//! Signature-scan decoder.
//!
//! The device sends one long byte run with no framing. Everything before the
//! first [`START_MARKER`] is discarded; from the marker on, every received
//! chunk is passed through untouched and never rescanned.

use std::time::Duration;

use bytes::Bytes;
use tracing::{info, trace};

use super::MarkerScan;
use crate::error::{CamwireError, Result};
use crate::protocol::{find_start_marker, Frame, SCAN_CHUNK_SIZE, START_MARKER};
use crate::transport::Transport;

/// Decoder for the unframed stream.
pub struct SignatureScanDecoder {
    found_start: bool,
    scan: MarkerScan,
    timeout: Option<Duration>,
    chunk: Vec<u8>,
    /// Unmatched tail of the previous chunk (rolling-window mode only).
    carry: Vec<u8>,
}

impl SignatureScanDecoder {
    /// Create a decoder that has not yet seen the start marker.
    pub fn new(scan: MarkerScan, timeout: Option<Duration>) -> Self {
        Self {
            found_start: false,
            scan,
            timeout,
            chunk: vec![0u8; SCAN_CHUNK_SIZE],
            carry: Vec::with_capacity(START_MARKER.len()),
        }
    }

    /// Whether the start marker has been seen.
    pub fn has_started(&self) -> bool {
        self.found_start
    }

    /// Receive until there are bytes to emit.
    ///
    /// Before the marker this may take many receives; afterwards each call
    /// returns exactly one received chunk.
    pub async fn next_frame<T: Transport>(&mut self, transport: &mut T) -> Result<Frame> {
        loop {
            let n = transport.receive(&mut self.chunk, self.timeout).await?;
            if n == 0 {
                return Err(CamwireError::ConnectionClosed);
            }

            if self.found_start {
                return Ok(Frame::copy_from_slice(&self.chunk[..n]));
            }

            if let Some(frame) = self.locate_start(n) {
                info!("stream start marker found");
                self.found_start = true;
                return Ok(frame);
            }
            trace!(bytes = n, "discarded bytes before start marker");
        }
    }

    fn locate_start(&mut self, n: usize) -> Option<Frame> {
        let data = &self.chunk[..n];
        match self.scan {
            MarkerScan::PerChunk => {
                let pos = find_start_marker(data)?;
                Some(Frame::copy_from_slice(&data[pos..]))
            }
            MarkerScan::RollingWindow => {
                let mut window = std::mem::take(&mut self.carry);
                window.extend_from_slice(data);
                match find_start_marker(&window) {
                    Some(pos) => Some(Frame::new(Bytes::from(window).slice(pos..))),
                    None => {
                        let keep = window.len().min(START_MARKER.len() - 1);
                        window.drain(..window.len() - keep);
                        self.carry = window;
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::ScriptedTransport;

    const MARKER: &[u8] = &START_MARKER;

    fn cat(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    async fn drain(
        decoder: &mut SignatureScanDecoder,
        t: &mut ScriptedTransport,
    ) -> (Vec<u8>, CamwireError) {
        let mut out = Vec::new();
        loop {
            match decoder.next_frame(t).await {
                Ok(frame) => out.extend_from_slice(frame.payload()),
                Err(e) => return (out, e),
            }
        }
    }

    #[tokio::test]
    async fn test_emits_from_marker_then_passes_through() {
        let mut t = ScriptedTransport::new()
            .data(cat(&[b"xxx", MARKER, b"abc"]))
            .data(b"def");
        let mut d = SignatureScanDecoder::new(MarkerScan::PerChunk, None);

        let (out, err) = drain(&mut d, &mut t).await;

        assert_eq!(out, cat(&[MARKER, b"abc", b"def"]));
        assert!(matches!(err, CamwireError::ConnectionClosed));
        assert!(d.has_started());
    }

    #[tokio::test]
    async fn test_no_marker_emits_nothing() {
        let mut t = ScriptedTransport::new()
            .data(b"no image here")
            .data(b"\xFF\xD8 still nothing")
            .data(vec![0u8; 3000]);
        let mut d = SignatureScanDecoder::new(MarkerScan::PerChunk, None);

        let (out, _) = drain(&mut d, &mut t).await;

        assert!(out.is_empty());
        assert!(!d.has_started());
    }

    #[tokio::test]
    async fn test_later_chunks_are_not_rescanned() {
        // the second marker must be passed through verbatim, not treated as a restart
        let mut t = ScriptedTransport::new()
            .data(cat(&[MARKER, b"1"]))
            .data(cat(&[b"junk", MARKER, b"2"]));
        let mut d = SignatureScanDecoder::new(MarkerScan::PerChunk, None);

        let first = d.next_frame(&mut t).await.unwrap();
        let second = d.next_frame(&mut t).await.unwrap();

        assert_eq!(first.payload(), cat(&[MARKER, b"1"]).as_slice());
        assert_eq!(second.payload(), cat(&[b"junk", MARKER, b"2"]).as_slice());
    }

    #[tokio::test]
    async fn test_marker_at_chunk_end_is_found() {
        let mut t = ScriptedTransport::new().data(cat(&[b"abc", MARKER]));
        let mut d = SignatureScanDecoder::new(MarkerScan::PerChunk, None);

        let frame = d.next_frame(&mut t).await.unwrap();
        assert_eq!(frame.payload(), MARKER);
    }

    #[tokio::test]
    async fn test_split_marker_not_detected_per_chunk() {
        let mut t = ScriptedTransport::new()
            .data(cat(&[b"aa", &MARKER[..2]]))
            .data(cat(&[&MARKER[2..], b"bb"]))
            .data(b"cc");
        let mut d = SignatureScanDecoder::new(MarkerScan::PerChunk, None);

        let (out, _) = drain(&mut d, &mut t).await;

        assert!(out.is_empty());
        assert!(!d.has_started());
    }

    #[tokio::test]
    async fn test_split_marker_detected_with_rolling_window() {
        let mut t = ScriptedTransport::new()
            .data(cat(&[b"aa", &MARKER[..2]]))
            .data(cat(&[&MARKER[2..], b"bb"]))
            .data(b"cc");
        let mut d = SignatureScanDecoder::new(MarkerScan::RollingWindow, None);

        let (out, _) = drain(&mut d, &mut t).await;

        assert_eq!(out, cat(&[MARKER, b"bb", b"cc"]));
    }

    #[tokio::test]
    async fn test_rolling_window_marker_spanning_three_chunks() {
        let mut t = ScriptedTransport::new()
            .data(&MARKER[..1])
            .data(&MARKER[1..2])
            .data(cat(&[&MARKER[2..], b"z"]));
        let mut d = SignatureScanDecoder::new(MarkerScan::RollingWindow, None);

        let frame = d.next_frame(&mut t).await.unwrap();
        assert_eq!(frame.payload(), cat(&[MARKER, b"z"]).as_slice());
    }

    #[tokio::test]
    async fn test_failure_before_marker_is_fatal() {
        let mut t = ScriptedTransport::new()
            .data(b"garbage")
            .fail()
            .data(cat(&[MARKER, b"never"]));
        let mut d = SignatureScanDecoder::new(MarkerScan::PerChunk, None);

        let err = d.next_frame(&mut t).await.unwrap_err();

        assert!(matches!(err, CamwireError::Io(_)));
        assert_eq!(t.receive_calls, 2);
    }

    #[tokio::test]
    async fn test_receives_in_fixed_size_chunks() {
        let mut big = MARKER.to_vec();
        big.extend(vec![7u8; SCAN_CHUNK_SIZE * 2]);
        let mut t = ScriptedTransport::new().data(&big);
        let mut d = SignatureScanDecoder::new(MarkerScan::PerChunk, None);

        let first = d.next_frame(&mut t).await.unwrap();
        assert_eq!(first.len(), SCAN_CHUNK_SIZE);
    }
}

//! Protocol module - login record, frame header, and frame type.
//!
//! This module implements the binary records exchanged with the device:
//! - 80-byte login record sent once after connect
//! - 16-byte header of the length-prefixed stream
//! - Start marker of the signature-scan stream

mod frame;
mod login;
mod wire_format;

pub use frame::Frame;
pub use login::{LoginRequest, DEFAULT_IDENTIFIER, FIELD_SIZE, LOGIN_SIZE, MAX_FIELD_LEN};
pub use wire_format::{
    find_start_marker, FrameHeader, DEFAULT_PORT, HEADER_SIZE, PAYLOAD_BUFFER_SIZE,
    SCAN_CHUNK_SIZE, START_MARKER,
};

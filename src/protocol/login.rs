//! Login record sent once before streaming starts.
//!
//! Layout (80 bytes, no padding):
//! ```text
//! ┌─────────┬──────────┬──────────────┬──────────────┐
//! │ Flags   │ Reserved │ Identifier   │ Access code  │
//! │ 8 bytes │ 8 bytes  │ 32 bytes NUL │ 32 bytes NUL │
//! └─────────┴──────────┴──────────────┴──────────────┘
//! ```

use crate::error::{CamwireError, Result};

/// Encoded login size in bytes (fixed, exactly 80).
pub const LOGIN_SIZE: usize = 80;

/// Width of each text field, terminator included.
pub const FIELD_SIZE: usize = 32;

/// Longest identifier or access code that still leaves room for the NUL.
pub const MAX_FIELD_LEN: usize = FIELD_SIZE - 1;

/// Identifier the device expects from streaming clients.
pub const DEFAULT_IDENTIFIER: &str = "bblp";

const FLAGS_OFFSET: usize = 0;
const IDENTIFIER_OFFSET: usize = 16;
const ACCESS_CODE_OFFSET: usize = 48;

/// Flag bytes: 0x40 at offset 0, 0x30 at offset 5.
const FLAGS: [u8; 8] = [0x40, 0, 0, 0, 0, 0x30, 0, 0];

/// A validated login record.
///
/// # Example
///
/// ```
/// use camwire_client::protocol::{LoginRequest, LOGIN_SIZE};
///
/// let login = LoginRequest::new("12345678").unwrap();
/// let bytes = login.encode();
/// assert_eq!(bytes.len(), LOGIN_SIZE);
/// assert_eq!(bytes[0], 0x40);
/// assert_eq!(&bytes[48..56], b"12345678");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    identifier: String,
    access_code: String,
}

impl LoginRequest {
    /// Create a login with the default identifier.
    pub fn new(access_code: &str) -> Result<Self> {
        Self::with_identifier(DEFAULT_IDENTIFIER, access_code)
    }

    /// Create a login with a custom identifier.
    ///
    /// Both fields must be at most [`MAX_FIELD_LEN`] bytes.
    pub fn with_identifier(identifier: &str, access_code: &str) -> Result<Self> {
        if identifier.len() > MAX_FIELD_LEN {
            return Err(CamwireError::IdentifierTooLong {
                len: identifier.len(),
                max: MAX_FIELD_LEN,
            });
        }
        if access_code.len() > MAX_FIELD_LEN {
            return Err(CamwireError::CredentialTooLong {
                len: access_code.len(),
                max: MAX_FIELD_LEN,
            });
        }
        Ok(Self {
            identifier: identifier.to_string(),
            access_code: access_code.to_string(),
        })
    }

    /// Identifier field value.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Encode the record.
    pub fn encode(&self) -> [u8; LOGIN_SIZE] {
        let mut buf = [0u8; LOGIN_SIZE];
        buf[FLAGS_OFFSET..FLAGS_OFFSET + FLAGS.len()].copy_from_slice(&FLAGS);
        copy_field(&mut buf[IDENTIFIER_OFFSET..], self.identifier.as_bytes());
        copy_field(&mut buf[ACCESS_CODE_OFFSET..], self.access_code.as_bytes());
        buf
    }
}

// Lengths were checked at construction.
fn copy_field(dst: &mut [u8], src: &[u8]) {
    dst[..src.len()].copy_from_slice(src);
}

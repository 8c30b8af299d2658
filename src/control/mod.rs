//! Control module - the one-shot login handshake.
//!
//! The handshake is a single 80-byte write right after connect. The device
//! sends no reply; the next bytes on the wire are already stream data.
//!
//! # Example
//!
//! ```ignore
//! use camwire_client::control::login;
//!
//! conn.connect("192.168.1.20", 6000, true).await?;
//! login(&mut conn, "12345678").await?;
//! ```

mod handshake;

pub use handshake::{login, send_login};

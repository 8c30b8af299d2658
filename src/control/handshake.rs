//! Login handshake.

use tracing::info;

use crate::error::Result;
use crate::protocol::LoginRequest;
use crate::transport::Transport;

/// Send a prepared login record exactly once.
///
/// No response is read.
pub async fn send_login<T: Transport>(transport: &mut T, request: &LoginRequest) -> Result<()> {
    transport.send(&request.encode()).await?;
    info!(identifier = request.identifier(), "login sent");
    Ok(())
}

/// Build a login with the default identifier and send it.
///
/// # Errors
///
/// Returns [`CredentialTooLong`](crate::CamwireError::CredentialTooLong)
/// without touching the transport if `access_code` does not fit.
pub async fn login<T: Transport>(transport: &mut T, access_code: &str) -> Result<()> {
    let request = LoginRequest::new(access_code)?;
    send_login(transport, &request).await
}

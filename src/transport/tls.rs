//! TLS client context.
//!
//! Devices present a self-signed certificate, so the default verification
//! mode accepts any server certificate while still checking handshake
//! signatures. Pass trust anchors via [`TlsVerification::Roots`] to verify
//! the peer properly.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use serde::{Deserialize, Serialize};

use crate::error::{CamwireError, ErrorLocation, Result, TransportErrorKind};

/// What to do when the TLS handshake fails on an open TCP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsFallback {
    /// Keep going over the plaintext socket (fail-open).
    #[default]
    Plaintext,
    /// Fail the connect call (fail-closed).
    Abort,
}

/// How the server certificate is checked.
#[derive(Debug, Clone, Default)]
pub enum TlsVerification {
    /// Accept any certificate.
    #[default]
    AcceptAny,
    /// Verify the chain and server name against these trust anchors.
    Roots(Vec<CertificateDer<'static>>),
}

/// Build the client context for one connection.
pub(crate) fn build_client_config(verification: &TlsVerification) -> Result<Arc<ClientConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| {
            CamwireError::transport(
                TransportErrorKind::PlatformInitFailed,
                ErrorLocation::SecureTransport,
                e,
            )
        })?;

    let config = match verification {
        TlsVerification::AcceptAny => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
            .with_no_client_auth(),
        TlsVerification::Roots(certs) => {
            let mut roots = RootCertStore::empty();
            for cert in certs {
                roots.add(cert.clone()).map_err(|e| {
                    CamwireError::transport(
                        TransportErrorKind::CreateFailed,
                        ErrorLocation::SecureTransport,
                        e,
                    )
                })?;
            }
            builder.with_root_certificates(roots).with_no_client_auth()
        }
    };

    Ok(Arc::new(config))
}

#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

//! TLS certificate presence check.
//!
//! A handshake is made to port 443 with certificate verification disabled.
//! Trust is irrelevant here: a served certificate chain, valid or not, means
//! something is deployed on the name.

use crate::error::ScanError;
use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as RustlsError, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

const HTTPS_PORT: u16 = 443;

#[async_trait]
pub trait TlsProbe: Send + Sync {
    /// Whether `domain:443` completes a handshake and presents a certificate.
    async fn has_certificate(&self, domain: &str) -> Result<bool, ScanError>;
}

/// Handshake-only probe built on tokio-rustls.
#[derive(Clone)]
pub struct TlsCertificateProbe {
    connector: TlsConnector,
    connect_timeout: Duration,
}

impl TlsCertificateProbe {
    pub fn new(connect_timeout: Duration) -> Result<Self, ScanError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| ScanError::internal(format!("TLS configuration failed: {}", e)))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            connect_timeout,
        })
    }

    async fn handshake(&self, domain: &str) -> Result<bool, ScanError> {
        let server_name = ServerName::try_from(domain.to_string())
            .map_err(|e| ScanError::invalid_domain(domain, e.to_string()))?;

        let tcp = TcpStream::connect((domain, HTTPS_PORT))
            .await
            .map_err(|e| ScanError::tls(domain, format!("connect failed: {}", e)))?;

        let stream = self
            .connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| ScanError::tls(domain, format!("handshake failed: {}", e)))?;

        let (_, session) = stream.get_ref();
        Ok(session
            .peer_certificates()
            .is_some_and(|chain| !chain.is_empty()))
    }
}

#[async_trait]
impl TlsProbe for TlsCertificateProbe {
    async fn has_certificate(&self, domain: &str) -> Result<bool, ScanError> {
        timeout(self.connect_timeout, self.handshake(domain))
            .await
            .map_err(|_| ScanError::timeout(format!("TLS handshake with {}", domain), self.connect_timeout))?
    }
}

/// Accepts every certificate. Only the presence of a chain is observed.
#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

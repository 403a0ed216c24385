// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Guacamole REST Client - TLS Module
// Certificate verification modes for HTTPS connections to the Guacamole server

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as TlsError, RootCertStore, SignatureScheme};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Verifier that either pins the leaf certificate by fingerprint or, with no
/// pin, accepts any certificate (`ssl_verify = false`).
///
/// A pinned peer must still prove it holds the certificate's key, so handshake
/// signatures are checked against the provider's algorithms in that mode.
#[derive(Debug)]
struct RelaxedVerifier {
    pinned_fingerprint: Option<String>,
    algorithms: WebPkiSupportedAlgorithms,
}

impl RelaxedVerifier {
    fn pinned(fingerprint: &str) -> Self {
        Self {
            pinned_fingerprint: Some(normalize_fingerprint(fingerprint)),
            algorithms: provider_algorithms(),
        }
    }

    fn unverified() -> Self {
        Self {
            pinned_fingerprint: None,
            algorithms: provider_algorithms(),
        }
    }
}

fn provider_algorithms() -> WebPkiSupportedAlgorithms {
    rustls::crypto::aws_lc_rs::default_provider().signature_verification_algorithms
}

/// SHA-256 fingerprint of a DER certificate as colon-separated upper hex
pub fn certificate_fingerprint(cert: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cert);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Accept "aa:bb:..", "AABB.." and "AA BB .." spellings of the same fingerprint
fn normalize_fingerprint(fingerprint: &str) -> String {
    let hex: String = fingerprint
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    hex.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

impl ServerCertVerifier for RelaxedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, TlsError> {
        let Some(expected) = &self.pinned_fingerprint else {
            return Ok(ServerCertVerified::assertion());
        };

        let actual = certificate_fingerprint(end_entity.as_ref());
        if &actual == expected {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(TlsError::InvalidCertificate(
                rustls::CertificateError::Other(rustls::OtherError(Arc::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!(
                            "Certificate fingerprint mismatch. Expected: {}, Got: {}",
                            expected, actual
                        ),
                    ),
                ))),
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        if self.pinned_fingerprint.is_none() {
            return Ok(HandshakeSignatureValid::assertion());
        }
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        if self.pinned_fingerprint.is_none() {
            return Ok(HandshakeSignatureValid::assertion());
        }
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

fn install_crypto_provider() {
    // Already installed is fine
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// rustls config that only trusts a certificate with the given fingerprint
pub fn create_pinned_tls_config(fingerprint: &str) -> Result<ClientConfig> {
    install_crypto_provider();

    if normalize_fingerprint(fingerprint).len() != 95 {
        return Err(Error::Tls(format!(
            "'{}' is not a SHA-256 certificate fingerprint",
            fingerprint
        )));
    }

    Ok(ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(RelaxedVerifier::pinned(fingerprint)))
        .with_no_client_auth())
}

/// rustls config that accepts any server certificate
pub fn create_unverified_tls_config() -> Result<ClientConfig> {
    install_crypto_provider();

    Ok(ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(RelaxedVerifier::unverified()))
        .with_no_client_auth())
}

/// rustls config verifying against the webpki root store
pub fn create_verified_tls_config() -> Result<ClientConfig> {
    install_crypto_provider();

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    Ok(ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth())
}

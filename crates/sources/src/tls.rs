//! TLS acceptor setup
//!
//! Builds a `tokio_rustls::TlsAcceptor` from PEM files. The certificate
//! chain and the private key may live in the same file; `server.pem` holding
//! both is the default layout.
//!
//! Keys may be PKCS#8, PKCS#1 (RSA) or SEC1 (EC). Any failure here is a
//! startup error.

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::crypto::ring::default_provider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;

/// TLS setup errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// Certificate or key file could not be read
    #[error("failed to read {kind} file '{path}': {source}")]
    Read {
        kind: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PEM data is malformed
    #[error("invalid PEM in {kind}: {source}")]
    Pem {
        kind: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// PEM data contains no certificate
    #[error("no certificates found in {0}")]
    NoCertificates(String),

    /// PEM data contains no private key
    #[error("no private key found in {0}")]
    NoPrivateKey(String),

    /// rustls rejected the certificate/key pair
    #[error("invalid TLS configuration: {0}")]
    Config(#[from] rustls::Error),
}

/// Parse every certificate in PEM data
pub fn certs_from_pem(
    pem: &[u8],
    origin: &str,
) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = BufReader::new(pem);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Pem {
            kind: "certificate",
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(origin.to_string()));
    }
    Ok(certs)
}

/// Parse the first private key in PEM data
pub fn private_key_from_pem(
    pem: &[u8],
    origin: &str,
) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = BufReader::new(pem);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Pem {
            kind: "private key",
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(origin.to_string()))
}

/// Build an acceptor from PEM data
pub fn acceptor_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<TlsAcceptor, TlsError> {
    let certs = certs_from_pem(cert_pem, "certificate PEM")?;
    let key = private_key_from_pem(key_pem, "key PEM")?;
    build_acceptor(certs, key)
}

/// Build an acceptor from certificate and key files
///
/// `cert_path` and `key_path` may be the same file.
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, TlsError> {
    let cert_pem = read_pem("certificate", cert_path)?;
    let key_pem = if key_path == cert_path {
        cert_pem.clone()
    } else {
        read_pem("private key", key_path)?
    };

    let certs = certs_from_pem(&cert_pem, &cert_path.display().to_string())?;
    let key = private_key_from_pem(&key_pem, &key_path.display().to_string())?;
    let acceptor = build_acceptor(certs, key)?;

    tracing::debug!(
        cert = %cert_path.display(),
        key = %key_path.display(),
        "TLS acceptor ready"
    );
    Ok(acceptor)
}

fn build_acceptor(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Result<TlsAcceptor, TlsError> {
    let config = ServerConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn read_pem(kind: &'static str, path: &Path) -> Result<Vec<u8>, TlsError> {
    fs::read(path).map_err(|source| TlsError::Read {
        kind,
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "tls_test.rs"]
mod tls_test;

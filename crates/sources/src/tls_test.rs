use super::*;

use tempfile::TempDir;

use crate::test_support::self_signed;

#[test]
fn test_acceptor_from_pem() {
    let cert = self_signed();
    assert!(acceptor_from_pem(cert.cert_pem.as_bytes(), cert.key_pem.as_bytes()).is_ok());
}

#[test]
fn test_load_acceptor_combined_file() {
    let cert = self_signed();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.pem");
    fs::write(&path, format!("{}{}", cert.cert_pem, cert.key_pem)).unwrap();

    assert!(load_acceptor(&path, &path).is_ok());
}

#[test]
fn test_load_acceptor_separate_files() {
    let cert = self_signed();
    let dir = TempDir::new().unwrap();
    let cert_path = dir.path().join("cert.pem");
    let key_path = dir.path().join("key.pem");
    fs::write(&cert_path, &cert.cert_pem).unwrap();
    fs::write(&key_path, &cert.key_pem).unwrap();

    assert!(load_acceptor(&cert_path, &key_path).is_ok());
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.pem");

    let Err(err) = load_acceptor(&path, &path) else {
        panic!("missing certificate file accepted");
    };
    assert!(matches!(err, TlsError::Read { kind: "certificate", .. }));
    assert!(err.to_string().contains("missing.pem"));
}

#[test]
fn test_no_certificates() {
    let cert = self_signed();
    let Err(err) = acceptor_from_pem(cert.key_pem.as_bytes(), cert.key_pem.as_bytes()) else {
        panic!("key-only PEM accepted as a certificate chain");
    };
    assert!(matches!(err, TlsError::NoCertificates(_)));
}

#[test]
fn test_no_private_key() {
    let cert = self_signed();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.pem");
    fs::write(&path, &cert.cert_pem).unwrap();

    let Err(err) = load_acceptor(&path, &path) else {
        panic!("certificate-only PEM accepted as a private key");
    };
    assert!(matches!(err, TlsError::NoPrivateKey(ref origin) if origin.contains("server.pem")));
}

#[test]
fn test_empty_input() {
    assert!(matches!(
        certs_from_pem(b"", "empty"),
        Err(TlsError::NoCertificates(origin)) if origin == "empty"
    ));
    assert!(matches!(
        private_key_from_pem(b"", "empty"),
        Err(TlsError::NoPrivateKey(_))
    ));
}

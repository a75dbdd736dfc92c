//! Shared helpers for TLS end-to-end tests

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rcgen::{CertifiedKey, generate_simple_self_signed};
use rustls::ClientConfig;
use rustls::RootCertStore;
use rustls::crypto::ring::default_provider;
use rustls::pki_types::{CertificateDer, ServerName};
use tlslog_pipeline::{MemoryBoundedQueue, Palette, Router, SinkHandle};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::sync::CancellationToken;

/// Self-signed certificate for `localhost`
pub struct TestCert {
    pub cert_pem: String,
    pub key_pem: String,
    pub cert_der: CertificateDer<'static>,
}

pub fn self_signed() -> TestCert {
    let CertifiedKey { cert, key_pair } =
        generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    TestCert {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
        cert_der: cert.der().clone(),
    }
}

pub fn connector(cert: &TestCert) -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.add(cert.cert_der.clone()).unwrap();

    let config = ClientConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

pub async fn connect<IO>(cert: &TestCert, io: IO) -> std::io::Result<TlsStream<IO>>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    let domain = ServerName::try_from("localhost").unwrap();
    connector(cert).connect(domain, io).await
}

/// Sink whose consumer collects every line in memory
pub fn collecting_sink(name: &str) -> (SinkHandle, Arc<Mutex<Vec<String>>>) {
    let queue = Arc::new(MemoryBoundedQueue::new(1024 * 1024));
    let abort = CancellationToken::new();
    let lines = Arc::new(Mutex::new(Vec::new()));

    let task = tokio::spawn({
        let queue = Arc::clone(&queue);
        let abort = abort.clone();
        let lines = Arc::clone(&lines);
        async move {
            loop {
                tokio::select! {
                    biased;
                    _ = abort.cancelled() => break,
                    item = queue.pop() => match item {
                        Some(line) => lines.lock().push(line),
                        None => break,
                    },
                }
            }
        }
    });

    (SinkHandle::new(name, queue, abort, task), lines)
}

/// Router with a collecting file sink and no console
pub fn collecting_router() -> (Arc<Router>, Arc<Mutex<Vec<String>>>) {
    let (file, lines) = collecting_sink("file");
    (Arc::new(Router::new(file, Palette::default())), lines)
}

/// Poll `condition` every 10ms for up to 5s
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Await `future` for at most 5s
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

use super::*;

use tlslog_pipeline::Palette;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::test_support::{
    TestCert, collecting_router, collecting_sink, connect, eventually, self_signed, within,
};
use crate::tls::acceptor_from_pem;

struct Running {
    supervisor: Arc<Supervisor>,
    address: SocketAddr,
    cert: TestCert,
    run: JoinHandle<Result<(), SourceError>>,
}

fn test_config() -> SupervisorConfig {
    SupervisorConfig {
        address: "127.0.0.1".into(),
        port: 0,
        shutdown_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

async fn start(config: SupervisorConfig, router: Arc<Router>) -> Running {
    let cert = self_signed();
    let acceptor = acceptor_from_pem(cert.cert_pem.as_bytes(), cert.key_pem.as_bytes()).unwrap();
    let supervisor = Arc::new(Supervisor::new(config, acceptor, router));
    let address = supervisor.bind().await.unwrap();

    let running = Arc::clone(&supervisor);
    let run = tokio::spawn(async move { running.run().await });

    Running {
        supervisor,
        address,
        cert,
        run,
    }
}

async fn send_frame<IO>(client: &mut tokio_rustls::client::TlsStream<IO>, frame: &str)
where
    IO: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    client.write_all(frame.as_bytes()).await.unwrap();
    client.flush().await.unwrap();
}

// =============================================================================
// Configuration tests
// =============================================================================

#[test]
fn test_config_default() {
    let config = SupervisorConfig::default();
    assert_eq!(config.port, 60119);
    assert_eq!(config.bind_address(), "0.0.0.0:60119");
    assert_eq!(config.max_connections, 0);
    assert!(config.nodelay);
    assert!(config.keepalive);
    assert_eq!(config.worker.read_buffer_size, 20 * 1024);
    assert_eq!(config.worker.read_timeout, Duration::from_secs(60));
}

// =============================================================================
// Lifecycle tests
// =============================================================================

#[tokio::test]
async fn test_state_transitions() {
    let (router, _lines) = collecting_router();
    let cert = self_signed();
    let acceptor = acceptor_from_pem(cert.cert_pem.as_bytes(), cert.key_pem.as_bytes()).unwrap();
    let supervisor = Supervisor::new(test_config(), acceptor, router);

    assert_eq!(supervisor.state(), SupervisorState::Stopped);
    supervisor.bind().await.unwrap();
    assert_eq!(supervisor.state(), SupervisorState::Listening);
    supervisor.shutdown(true).await;
    assert_eq!(supervisor.state(), SupervisorState::Stopped);

    assert!(matches!(supervisor.run().await, Err(SourceError::ShutDown)));
}

#[tokio::test]
async fn test_bind_conflict_is_startup_error() {
    let (router, _lines) = collecting_router();
    let first = start(test_config(), router).await;

    let (router, _lines) = collecting_router();
    let config = SupervisorConfig {
        port: first.address.port(),
        ..test_config()
    };
    let acceptor = acceptor_from_pem(
        first.cert.cert_pem.as_bytes(),
        first.cert.key_pem.as_bytes(),
    )
    .unwrap();
    let second = Supervisor::new(config, acceptor, router);

    assert!(matches!(second.bind().await, Err(SourceError::Bind { .. })));
    first.supervisor.shutdown(false).await;
}

// =============================================================================
// End-to-end tests
// =============================================================================

#[tokio::test]
async fn test_end_to_end_graceful_shutdown() {
    let (file, file_lines) = collecting_sink("file");
    let (console, console_lines) = collecting_sink("console");
    let router = Arc::new(Router::new(file, Palette::default()).with_console(console));
    let running = start(test_config(), router).await;

    let tcp = TcpStream::connect(running.address).await.unwrap();
    let mut client = within(connect(&running.cert, tcp)).await.unwrap();

    send_frame(&mut client, "17 <166>hello world").await;
    assert!(eventually(|| file_lines.lock().len() == 1).await);
    send_frame(&mut client, "12 <11>failure").await;
    assert!(eventually(|| file_lines.lock().len() == 2).await);

    assert_eq!(running.supervisor.connection_count(), 1);
    within(running.supervisor.shutdown(true)).await;
    assert_eq!(running.supervisor.state(), SupervisorState::Stopped);
    assert!(within(running.run).await.unwrap().is_ok());

    assert_eq!(*file_lines.lock(), vec!["<166>hello world", "<11>failure"]);
    assert_eq!(
        *console_lines.lock(),
        vec![
            "\x1b[34m<166>hello world\x1b[0m",
            "\x1b[91m<11>failure\x1b[0m",
        ]
    );

    // the open connection was torn down with close_notify
    let mut buf = [0u8; 16];
    assert_eq!(within(client.read(&mut buf)).await.unwrap(), 0);

    let snapshot = running.supervisor.metrics_handle().snapshot();
    assert_eq!(snapshot.connections_total, 1);
    assert_eq!(snapshot.connections_active, 0);
    assert_eq!(snapshot.frames_received, 2);
}

#[tokio::test]
async fn test_unsupported_severity_dropped() {
    let (router, lines) = collecting_router();
    let running = start(test_config(), Arc::clone(&router)).await;

    let tcp = TcpStream::connect(running.address).await.unwrap();
    let mut client = within(connect(&running.cert, tcp)).await.unwrap();

    // <12> is severity 4 (warning), not routed
    send_frame(&mut client, "10 <12>warn!").await;
    assert!(eventually(|| router.metrics().snapshot().severity_unsupported == 1).await);
    send_frame(&mut client, "9 <14>kept").await;
    assert!(eventually(|| lines.lock().len() == 1).await);

    client.shutdown().await.unwrap();
    within(running.supervisor.shutdown(true)).await;
    assert_eq!(*lines.lock(), vec!["<14>kept"]);
}

#[tokio::test]
async fn test_finished_connections_expire() {
    let (router, lines) = collecting_router();
    let running = start(test_config(), router).await;

    for i in 0..3 {
        let tcp = TcpStream::connect(running.address).await.unwrap();
        let mut client = within(connect(&running.cert, tcp)).await.unwrap();
        send_frame(&mut client, "9 <14>once").await;
        assert!(eventually(|| lines.lock().len() == i + 1).await);
        client.shutdown().await.unwrap();
    }

    let supervisor = Arc::clone(&running.supervisor);
    assert!(eventually(|| supervisor.connection_count() == 0).await);

    let snapshot = running.supervisor.metrics_handle().snapshot();
    assert_eq!(snapshot.connections_total, 3);
    assert_eq!(snapshot.connections_active, 0);

    // expired registry entries are skipped
    within(running.supervisor.shutdown(true)).await;
    assert_eq!(running.supervisor.state(), SupervisorState::Stopped);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let (router, _lines) = collecting_router();
    let running = start(test_config(), router).await;

    let tcp = TcpStream::connect(running.address).await.unwrap();
    let _client = within(connect(&running.cert, tcp)).await.unwrap();
    let supervisor = Arc::clone(&running.supervisor);
    assert!(eventually(|| supervisor.connection_count() == 1).await);

    within(async {
        tokio::join!(
            running.supervisor.shutdown(true),
            running.supervisor.shutdown(false)
        )
    })
    .await;
    within(running.supervisor.shutdown(true)).await;

    assert_eq!(running.supervisor.state(), SupervisorState::Stopped);
    assert!(within(running.run).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_abrupt_shutdown_is_prompt() {
    let (router, _lines) = collecting_router();
    let running = start(test_config(), router).await;

    let mut clients = Vec::new();
    for _ in 0..4 {
        let tcp = TcpStream::connect(running.address).await.unwrap();
        clients.push(within(connect(&running.cert, tcp)).await.unwrap());
    }
    let supervisor = Arc::clone(&running.supervisor);
    assert!(eventually(|| supervisor.connection_count() == 4).await);

    within(running.supervisor.shutdown(false)).await;
    assert_eq!(running.supervisor.connection_count(), 0);
    assert_eq!(running.supervisor.metrics_handle().snapshot().connections_active, 0);
}

#[tokio::test]
async fn test_connection_limit() {
    let (router, _lines) = collecting_router();
    let config = SupervisorConfig {
        max_connections: 1,
        ..test_config()
    };
    let running = start(config, router).await;

    let tcp = TcpStream::connect(running.address).await.unwrap();
    let _first = within(connect(&running.cert, tcp)).await.unwrap();
    let supervisor = Arc::clone(&running.supervisor);
    assert!(eventually(|| supervisor.connection_count() == 1).await);

    let tcp = TcpStream::connect(running.address).await.unwrap();
    assert!(within(connect(&running.cert, tcp)).await.is_err());

    let metrics = running.supervisor.metrics_handle();
    assert!(eventually(|| metrics.snapshot().connections_rejected == 1).await);
    assert_eq!(metrics.snapshot().connections_total, 1);

    within(running.supervisor.shutdown(false)).await;
}

#[tokio::test]
async fn test_handshake_failure_counted() {
    let (router, lines) = collecting_router();
    let running = start(test_config(), router).await;

    let mut plain = TcpStream::connect(running.address).await.unwrap();
    plain.write_all(b"17 <166>hello world").await.unwrap();

    let metrics = running.supervisor.metrics_handle();
    assert!(eventually(|| metrics.snapshot().handshake_failures == 1).await);
    assert!(lines.lock().is_empty());

    within(running.supervisor.shutdown(true)).await;
}

#[tokio::test]
async fn test_teardown_skips_expired_handles() {
    let (router, _lines) = collecting_router();
    let cert = self_signed();
    let acceptor = acceptor_from_pem(cert.cert_pem.as_bytes(), cert.key_pem.as_bytes()).unwrap();
    let supervisor = Supervisor::new(test_config(), acceptor, router);

    let live = Arc::new(ConnectionHandle::new(SocketAddr::from(([127, 0, 0, 1], 1))));
    let expired = Arc::new(ConnectionHandle::new(SocketAddr::from(([127, 0, 0, 1], 2))));
    supervisor.register(&live);
    supervisor.register(&expired);
    drop(expired);

    assert_eq!(supervisor.connection_count(), 1);
    assert_eq!(supervisor.request_teardown(), 1);
    assert!(live.is_teardown_requested());
}

#[tokio::test]
async fn test_connection_registered_after_shutdown_is_torn_down() {
    let (router, _lines) = collecting_router();
    let cert = self_signed();
    let acceptor = acceptor_from_pem(cert.cert_pem.as_bytes(), cert.key_pem.as_bytes()).unwrap();
    let supervisor = Supervisor::new(test_config(), acceptor, router);

    let early = Arc::new(ConnectionHandle::new(SocketAddr::from(([127, 0, 0, 1], 1))));
    supervisor.register(&early);

    within(supervisor.shutdown(false)).await;
    assert!(early.is_teardown_requested());

    // accepted just before the listener closed, registered after the sweep
    let late = Arc::new(ConnectionHandle::new(SocketAddr::from(([127, 0, 0, 1], 2))));
    supervisor.register(&late);
    assert!(late.is_teardown_requested());
}

//! Listener and per-connection settings

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// TLS listener configuration
///
/// # Example
///
/// ```toml
/// [server]
/// bind_address = "0.0.0.0"
/// port = 60119
/// cert_path = "server.pem"
/// key_path = "server.pem"
/// read_timeout = "60s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    /// Default: 0.0.0.0
    pub bind_address: String,

    /// Listen port
    /// Default: 60119
    pub port: u16,

    /// PEM file with the certificate chain
    /// Default: server.pem
    pub cert_path: PathBuf,

    /// PEM file with the private key (may be the certificate file)
    /// Default: server.pem
    pub key_path: PathBuf,

    /// TLS handshake deadline
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Duration,

    /// Deadline for a single read; a stalled connection is torn down
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Read buffer per connection, the largest frame accepted
    /// Default: 20480
    pub read_buffer_size: usize,

    /// TCP nodelay
    /// Default: true
    pub nodelay: bool,

    /// TCP keepalive
    /// Default: true
    pub keepalive: bool,

    /// Maximum concurrent connections (0 = unlimited)
    /// Default: 0
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 60119,
            cert_path: PathBuf::from("server.pem"),
            key_path: PathBuf::from("server.pem"),
            handshake_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            read_buffer_size: 20 * 1024,
            nodelay: true,
            keepalive: true,
            max_connections: 0,
        }
    }
}

impl ServerConfig {
    /// Get the socket address to bind to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

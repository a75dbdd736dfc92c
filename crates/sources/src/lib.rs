//! tlslog - Sources
//!
//! Everything between the network and the router: the TLS acceptor, the
//! supervisor that owns the listener, and one worker per connection.
//!
//! # Components
//!
//! - **tls** - builds a `TlsAcceptor` from PEM certificate and key files
//! - **supervisor** - accept loop, weak registry of live connections,
//!   idempotent `shutdown(graceful)`
//! - **worker** - handshake, read loop, teardown for one connection
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tlslog_sources::{Supervisor, SupervisorConfig, load_acceptor};
//!
//! let acceptor = load_acceptor("server.pem".as_ref(), "server.pem".as_ref())?;
//! let supervisor = Arc::new(Supervisor::new(SupervisorConfig::default(), acceptor, router));
//! supervisor.bind().await?;
//!
//! let running = Arc::clone(&supervisor);
//! tokio::spawn(async move { running.run().await });
//!
//! // on SIGINT / SIGTERM
//! supervisor.shutdown(true).await;
//! ```

mod common;
pub mod supervisor;
pub mod tls;
pub mod worker;

pub use common::{SourceMetrics, SourceMetricsSnapshot};
pub use supervisor::{
    SourceError, SourceMetricsHandle, Supervisor, SupervisorConfig, SupervisorState,
};
pub use tls::{TlsError, acceptor_from_pem, load_acceptor};
pub use worker::{
    ConnectionEnd, ConnectionHandle, ConnectionWorker, ReadErrorKind, WorkerConfig, WorkerState,
};

#[cfg(test)]
mod test_support;

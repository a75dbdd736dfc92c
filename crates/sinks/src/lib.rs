//! tlslog - Sinks
//!
//! Output sinks fed by the router through memory-bounded queues.
//!
//! # Architecture
//!
//! Each sink owns one consumer task popping from its own queue. The router
//! only ever sees the `SinkHandle` returned by `spawn()`.
//!
//! ```text
//! [Router] --String--> [MemoryBoundedQueue] --> [Sink Task] --> [Destination]
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Output | Rotation |
//! |------|--------|----------|
//! | `file` | `syslog_%Y_%m_%d_%H_%M_%S.txt`, plain text | By size |
//! | `console` | stdout, ANSI colored | No |
//!
//! # Example
//!
//! ```ignore
//! use tlslog_sinks::file::{FileSink, FileSinkConfig};
//!
//! let queue = Arc::new(MemoryBoundedQueue::new(budget));
//! let sink = FileSink::new(FileSinkConfig::default(), queue, CancellationToken::new());
//! let handle = sink.spawn();
//! let router = Router::new(handle, Palette::default());
//! ```

/// Console sink - colored records on stdout
pub mod console;

/// File sink - size-rotated plaintext files
pub mod file;

/// Shared utilities
pub mod util;

//! tlslog - Pipeline
//!
//! The memory-bounded queues and the router that connect connection workers
//! to sinks.
//!
//! # Architecture
//!
//! ```text
//! [Workers]                 [Router]                         [Sinks]
//!   conn 1 ─┐                                  ┌─→ MemoryBoundedQueue ─→ FileSink
//!   conn 2 ─┼──→ parse_frame ─→ Level ─→ fan-out
//!   conn N ─┘                                  └─→ MemoryBoundedQueue ─→ ConsoleSink
//! ```
//!
//! # Key Design
//!
//! - **Memory-bounded**: queues are bounded by estimated bytes, not item
//!   count; a producer at the ceiling waits instead of growing the backlog
//! - **Per-record drops**: framing and severity errors drop one record, never
//!   the connection
//! - **Closeable queues**: shutdown closes or clears queues instead of
//!   pushing sentinel items
//! - **Two stop modes**: `ShutdownMode::Graceful` drains, `Abrupt` discards
//!
//! # Example
//!
//! ```ignore
//! let router = Router::new(file_handle, Palette::default())
//!     .with_console(console_handle);
//!
//! router.route(b"17 <166>hello world").await?;
//! router.shutdown(ShutdownMode::Graceful, Duration::from_secs(10)).await;
//! ```

mod error;
mod metrics;
mod queue;
mod router;
mod sink_handle;

pub use error::{PipelineError, Result};
pub use metrics::{MetricsSnapshot, RouterMetrics};
pub use queue::{EstimateSize, ITEM_OVERHEAD_BYTES, MemoryBoundedQueue, QueueClosed};
pub use router::{COLOR_WRAP_BYTES, Palette, Router, RouterMetricsHandle, max_item_size};
pub use sink_handle::{ShutdownMode, SinkHandle};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Interceptor, fetchers, rewriter produce:
//!     → logging.rs (structured tracing events, optional JSON)
//!     → metrics.rs (request/rewrite/upstream-error counters, latency histogram)
//!
//! Consumers:
//!     → stdout (human or JSON lines)
//!     → Prometheus scrape endpoint (when enabled)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request via its span
//! - Metric updates are no-ops until an exporter is installed
//! - `RUST_LOG` always wins over the configured level

pub mod logging;
pub mod metrics;

pub use logging::init_logging;

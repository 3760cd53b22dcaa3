//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing request:
//!     → headers.rs outbound (drop browser metadata and credentials, fixed identity)
//! Incoming response:
//!     → headers.rs inbound (drop embedding/isolation policy, open CORS)
//! ```
//!
//! # Design Decisions
//! - Nothing that identifies the user or the proxy origin reaches the upstream
//! - Policies that would stop the page working under the proxy origin are removed;
//!   this proxy deliberately does not preserve origin isolation

pub mod headers;

pub use headers::{apply_cors, HeaderSanitizer};

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, /healthz)
//!     → request.rs (request ID + span)
//!     → interceptor.rs (pass through | reject | proxy)
//!     → response.rs (diagnostic pages for the failure paths)
//!     → Send to client
//! ```

pub mod interceptor;
pub mod request;
pub mod response;
pub mod server;

pub use interceptor::{classify, Interception};
pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{AppState, HttpServer};

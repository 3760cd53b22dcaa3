//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! [listener.tls] configured?
//!     no  → tokio TcpListener → axum::serve
//!     yes → tls.rs (load PEM files) → axum_server::bind_rustls
//! ```
//!
//! Both listeners share one router and one shutdown signal.

pub mod tls;

pub use tls::load_tls_config;

//! Rewriting forward proxy.
//!
//! Serves arbitrary web pages from under one path prefix on its own origin.
//! Each proxied request names its target in the path; the response is
//! fetched, stripped of headers that would stop it working here, and
//! rewritten so every reference it makes comes back through the proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::interceptor ──▶ addressing (decode)
//!                                            │
//!                                            ▼
//!                                  security::headers (outbound)
//!                                            │
//!                                            ▼
//!                                  upstream (direct | relay) ◀──▶ Origin
//!                                            │
//!                                            ▼
//!                                  security::headers (inbound)
//!                                            │
//!                                            ▼
//!     Client Response               rewrite (html | css | hooks)
//!     ◀──────────────────────────────────────┘
//!
//!     Cross-cutting: config, observability, lifecycle, net (TLS)
//! ```

// Core subsystems
pub mod addressing;
pub mod config;
pub mod http;
pub mod rewrite;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use addressing::{decode, encode, ProxyPrefix, TargetUrl};
pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

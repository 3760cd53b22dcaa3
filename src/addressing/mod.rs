//! Proxy addressing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming path "/uv/service/https%3A%2F%2Fsite.example%2F"
//!     → prefix.rs (is this proxy traffic? strip the prefix)
//!     → codec.rs  (percent-decode, normalise scheme, parse)
//!     → TargetUrl (absolute http(s) URL)
//!
//! Rewriting an embedded reference:
//!     absolute Url
//!     → codec.rs  (percent-encode)
//!     → prefix.rs (prepend prefix, optionally the public origin)
//!     → "/uv/service/https%3A%2F%2Fsite.example%2Fx"
//! ```
//!
//! # Design Decisions
//! - The address format is the only public contract of the proxy
//! - Encoding escapes everything but `A-Za-z0-9-_.~`; the injected hook escapes
//!   identically so static and dynamic rewriting agree byte for byte
//! - Decoding is strict: a malformed escape is an error, never a panic

pub mod codec;
pub mod prefix;

pub use codec::{decode, encode, DecodeError, TargetUrl};
pub use prefix::ProxyPrefix;

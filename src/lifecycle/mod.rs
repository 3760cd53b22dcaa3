//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → wait_for_signal() resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed listener stops accepting → in-flight requests drain → exit
//! ```
//!
//! # Design Decisions
//! - No reload: a restart picks up new configuration
//! - One broadcast channel fans the signal out to the plain and TLS listeners

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::addressing::ProxyPrefix;

/// Root configuration for the rewriting proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS, static fallback).
    pub listener: ListenerConfig,

    /// Address scheme and error surface.
    pub proxy: AddressConfig,

    /// Content rewriting switches.
    pub rewrite: RewriteConfig,

    /// How upstream content is retrieved.
    pub upstream: UpstreamConfig,

    /// Identity presented to upstream servers.
    pub sanitizer: SanitizerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Directory served for paths outside the proxy prefix.
    pub static_dir: Option<String>,

    /// Maximum request body size accepted from clients, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            static_dir: None,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Format of the page returned when the upstream cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPageFormat {
    Plain,
    Html,
}

/// Address scheme configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AddressConfig {
    /// Path namespace of proxied requests.
    pub prefix: String,

    /// Origin the proxy is reachable at, e.g. "https://proxy.example".
    /// When set, rewritten references are absolute.
    pub public_origin: Option<String>,

    /// Error page format for fetch failures. Defaults per fetch strategy.
    pub error_page: Option<ErrorPageFormat>,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            prefix: "/uv/service/".to_string(),
            public_origin: None,
            error_page: None,
        }
    }
}

impl AddressConfig {
    pub fn proxy_prefix(&self) -> ProxyPrefix {
        let prefix = ProxyPrefix::new(self.prefix.clone());
        match &self.public_origin {
            Some(origin) => prefix.with_public_origin(origin.clone()),
            None => prefix,
        }
    }

    /// The configured format, or the strategy's default.
    pub fn error_page_for(&self, strategy: FetchStrategy) -> ErrorPageFormat {
        self.error_page.unwrap_or(match strategy {
            FetchStrategy::Direct => ErrorPageFormat::Plain,
            FetchStrategy::Relay => ErrorPageFormat::Html,
        })
    }
}

/// Content rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Prepend the network hook prologue to JavaScript responses.
    pub inject_script_hooks: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            inject_script_hooks: true,
        }
    }
}

/// Upstream retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Request the target directly.
    Direct,
    /// GET the target through a third-party relay endpoint.
    Relay,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::Direct => "direct",
            FetchStrategy::Relay => "relay",
        }
    }
}

impl std::fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub strategy: FetchStrategy,

    /// Redirects followed before giving up.
    pub max_redirects: usize,

    /// Use HTTP(S)_PROXY from the environment for upstream requests.
    pub honor_system_proxy: bool,

    /// Relay settings, required when `strategy = "relay"`.
    pub relay: Option<RelayConfig>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::Direct,
            max_redirects: 10,
            honor_system_proxy: false,
            relay: None,
        }
    }
}

/// Third-party relay endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Relay URL, e.g. "https://api.allorigins.win/raw".
    pub endpoint: String,

    /// Query parameter carrying the target URL.
    #[serde(default = "default_relay_param")]
    pub query_param: String,
}

fn default_relay_param() -> String {
    "url".to_string()
}

/// Browser identity sent upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total upstream fetch timeout (including body) in seconds.
    pub upstream_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 45,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable output.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that the selected fetch strategy is fully configured
//! - Validate value ranges (timeouts > 0 and ordered, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::{FetchStrategy, ProxyConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address is not a socket address: {0}")]
    BindAddress(String),

    #[error("proxy.prefix must be a non-root path, got {0:?}")]
    Prefix(String),

    #[error("proxy.public_origin must be an http(s) origin without a path: {0}")]
    PublicOrigin(String),

    #[error("upstream.strategy = \"relay\" requires an [upstream.relay] section")]
    MissingRelay,

    #[error("upstream.relay.endpoint is not an http(s) URL: {0}")]
    RelayEndpoint(String),

    #[error("upstream.relay.query_param must not be empty")]
    RelayParam,

    #[error("sanitizer.{0} is not a valid header value")]
    HeaderValue(&'static str),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.upstream_secs ({upstream}) must be less than timeouts.request_secs ({request})")]
    TimeoutOrder { upstream: u64, request: u64 },

    #[error("observability.metrics_address is not a socket address: {0}")]
    MetricsAddress(String),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let prefix = config.proxy.prefix.trim_matches('/');
    if prefix.is_empty() || config.proxy.prefix.contains(['?', '#', '%']) {
        errors.push(ValidationError::Prefix(config.proxy.prefix.clone()));
    }

    if let Some(origin) = &config.proxy.public_origin {
        if !is_bare_origin(origin) {
            errors.push(ValidationError::PublicOrigin(origin.clone()));
        }
    }

    match (&config.upstream.strategy, &config.upstream.relay) {
        (FetchStrategy::Relay, None) => errors.push(ValidationError::MissingRelay),
        (_, Some(relay)) => {
            let valid = Url::parse(&relay.endpoint)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                errors.push(ValidationError::RelayEndpoint(relay.endpoint.clone()));
            }
            if relay.query_param.trim().is_empty() {
                errors.push(ValidationError::RelayParam);
            }
        }
        _ => {}
    }

    for (field, value) in [
        ("user_agent", &config.sanitizer.user_agent),
        ("accept", &config.sanitizer.accept),
        ("accept_language", &config.sanitizer.accept_language),
    ] {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::HeaderValue(field));
        }
    }

    for (field, value) in [
        ("connect_secs", config.timeouts.connect_secs),
        ("upstream_secs", config.timeouts.upstream_secs),
        ("request_secs", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(field));
        }
    }

    // The request deadline must outlast the upstream one, or a slow origin
    // is answered with a bare 408 instead of the fetch error page.
    let (upstream, request) = (config.timeouts.upstream_secs, config.timeouts.request_secs);
    if upstream > 0 && request > 0 && upstream >= request {
        errors.push(ValidationError::TimeoutOrder { upstream, request });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_bare_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}

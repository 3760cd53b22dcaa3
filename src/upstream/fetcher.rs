//! Strategy interface for retrieving upstream content.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use thiserror::Error;
use url::Url;

use crate::addressing::TargetUrl;
use crate::config::{FetchStrategy, TimeoutConfig, UpstreamConfig};

/// Upstream retrieval failed; rendered as a 500 diagnostic page.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FetchError {
    pub target_url: String,
    pub message: String,
}

impl FetchError {
    pub fn new(target: &TargetUrl, message: impl Into<String>) -> Self {
        Self {
            target_url: target.to_string(),
            message: message.into(),
        }
    }

    /// Describe a client failure without leaking the relay's own URL.
    pub fn from_reqwest(target: &TargetUrl, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "upstream request timed out".to_string()
        } else if err.is_connect() {
            format!("could not connect to upstream: {}", root_cause(err))
        } else if err.is_redirect() {
            "too many redirects".to_string()
        } else if err.is_body() || err.is_decode() {
            format!("failed to read upstream body: {}", root_cause(err))
        } else {
            root_cause(err)
        };
        Self::new(target, message)
    }
}

fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

/// A request as it leaves the proxy, headers already sanitized.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub target: TargetUrl,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What the upstream (or relay) answered.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// URL the content was finally served from, after redirects.
    pub final_url: Url,
    /// Strategy that produced this response.
    pub strategy: FetchStrategy,
}

/// Strategy interface: one implementation per deployment, chosen by config.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    async fn fetch_upstream(&self, request: OutboundRequest) -> Result<UpstreamResponse, FetchError>;

    fn strategy(&self) -> FetchStrategy;
}

/// Shared HTTP client for either strategy.
///
/// No cookie store is configured, so credentials are never forwarded.
pub fn build_client(
    upstream: &UpstreamConfig,
    timeouts: &TimeoutConfig,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.upstream_secs))
        .redirect(reqwest::redirect::Policy::limited(upstream.max_redirects));

    if !upstream.honor_system_proxy {
        builder = builder.no_proxy();
    }

    builder.build()
}

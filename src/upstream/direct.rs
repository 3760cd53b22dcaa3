//! Direct strategy: request the target from the proxy itself.

use async_trait::async_trait;
use axum::http::Method;

use super::fetcher::{FetchError, OriginFetcher, OutboundRequest, UpstreamResponse};
use crate::config::FetchStrategy;

/// Forwards method, sanitized headers and body straight to the target.
///
/// Non-2xx statuses are content too and pass through unchanged.
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: reqwest::Client,
}

impl DirectFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OriginFetcher for DirectFetcher {
    async fn fetch_upstream(&self, request: OutboundRequest) -> Result<UpstreamResponse, FetchError> {
        let OutboundRequest {
            target,
            method,
            headers,
            body,
        } = request;

        let carries_body = method != Method::GET && method != Method::HEAD;
        let mut builder = self
            .client
            .request(method, target.as_str())
            .headers(headers);
        if carries_body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&target, &e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();

        tracing::debug!(
            target = %target,
            final_url = %final_url,
            status = %status,
            "Upstream responded"
        );

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&target, &e))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
            final_url,
            strategy: FetchStrategy::Direct,
        })
    }

    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Direct
    }
}

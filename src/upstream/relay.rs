//! Relay strategy: GET the target through a third-party intermediary.
//!
//! Used when the deployment cannot reach arbitrary origins itself. Only GET
//! semantics survive the hop and the upstream's own headers are replaced by
//! the relay's, so this is a strict capability reduction over the direct
//! strategy.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::Method;
use url::Url;

use super::fetcher::{FetchError, OriginFetcher, OutboundRequest, UpstreamResponse};
use crate::config::{FetchStrategy, RelayConfig};

#[derive(Debug, Clone)]
pub struct RelayFetcher {
    client: reqwest::Client,
    endpoint: Url,
    query_param: String,
}

impl RelayFetcher {
    pub fn new(client: reqwest::Client, config: &RelayConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            endpoint: Url::parse(&config.endpoint)?,
            query_param: config.query_param.clone(),
        })
    }

    /// The relay URL that carries `target` as a query parameter.
    pub fn relay_url(&self, target: &Url) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(&self.query_param, target.as_str());
        url
    }
}

#[async_trait]
impl OriginFetcher for RelayFetcher {
    async fn fetch_upstream(&self, request: OutboundRequest) -> Result<UpstreamResponse, FetchError> {
        let target = request.target;
        let head_only = request.method == Method::HEAD;
        if request.method != Method::GET && !head_only {
            return Err(FetchError::new(
                &target,
                format!("relay strategy only supports GET requests, got {}", request.method),
            ));
        }

        let relay_url = self.relay_url(&target);
        tracing::debug!(target = %target, relay = %self.endpoint, "Fetching through relay");

        let response = self
            .client
            .get(relay_url)
            .headers(request.headers)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&target, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                &target,
                format!("relay responded with {status}"),
            ));
        }

        let headers = response.headers().clone();
        let body = if head_only {
            Bytes::new()
        } else {
            response
                .bytes()
                .await
                .map_err(|e| FetchError::from_reqwest(&target, &e))?
        };

        Ok(UpstreamResponse {
            status,
            headers,
            body,
            final_url: target.into_url(),
            strategy: FetchStrategy::Relay,
        })
    }

    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Relay
    }
}

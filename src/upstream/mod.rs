//! Origin fetching subsystem.
//!
//! # Data Flow
//! ```text
//! OutboundRequest (target + sanitized headers)
//!     → OriginFetcher (selected once at startup)
//!         ├─ direct.rs: request the target, follow redirects
//!         └─ relay.rs:  GET {relay}?url={target}
//!     → UpstreamResponse | FetchError
//! ```
//!
//! # Design Decisions
//! - One strategy per deployment; the pipeline never branches on it
//! - Every fetch is bounded by connect and total timeouts
//! - Failures are never retried; the user retries from the error page

pub mod direct;
pub mod fetcher;
pub mod relay;

use std::sync::Arc;

use thiserror::Error;

use crate::config::{FetchStrategy, ProxyConfig};

pub use direct::DirectFetcher;
pub use fetcher::{build_client, FetchError, OriginFetcher, OutboundRequest, UpstreamResponse};
pub use relay::RelayFetcher;

/// Failure to construct the configured strategy.
#[derive(Debug, Error)]
pub enum FetcherSetupError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("relay strategy selected but no relay configured")]
    MissingRelay,

    #[error("invalid relay endpoint: {0}")]
    RelayEndpoint(#[from] url::ParseError),
}

/// Build the fetcher selected by `upstream.strategy`.
pub fn build_fetcher(config: &ProxyConfig) -> Result<Arc<dyn OriginFetcher>, FetcherSetupError> {
    let client = build_client(&config.upstream, &config.timeouts)?;

    let fetcher: Arc<dyn OriginFetcher> = match config.upstream.strategy {
        FetchStrategy::Direct => Arc::new(DirectFetcher::new(client)),
        FetchStrategy::Relay => {
            let relay = config
                .upstream
                .relay
                .as_ref()
                .ok_or(FetcherSetupError::MissingRelay)?;
            Arc::new(RelayFetcher::new(client, relay)?)
        }
    };

    tracing::info!(strategy = %fetcher.strategy(), "Origin fetcher ready");
    Ok(fetcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;

    #[test]
    fn test_strategy_follows_config() {
        let mut config = ProxyConfig::default();
        assert_eq!(build_fetcher(&config).unwrap().strategy(), FetchStrategy::Direct);

        config.upstream.strategy = FetchStrategy::Relay;
        assert!(matches!(build_fetcher(&config), Err(FetcherSetupError::MissingRelay)));

        config.upstream.relay = Some(RelayConfig {
            endpoint: "https://relay.example/raw".into(),
            query_param: "url".into(),
        });
        assert_eq!(build_fetcher(&config).unwrap().strategy(), FetchStrategy::Relay);
    }
}

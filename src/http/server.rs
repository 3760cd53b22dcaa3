//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build shared state once: prefix, fetcher strategy, sanitizer, rewriter
//! - Create the Axum router: `/healthz` plus the interceptor as fallback
//! - Wire up middleware (timeout, body limit, request ID, tracing)
//! - Serve over plain TCP or TLS until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::addressing::ProxyPrefix;
use crate::config::{ErrorPageFormat, ProxyConfig, TlsConfig};
use crate::http::interceptor::intercept;
use crate::http::request::RequestIdLayer;
use crate::lifecycle::shutdown::recv_shutdown;
use crate::net::load_tls_config;
use crate::rewrite::ContentRewriter;
use crate::security::headers::HeaderSanitizer;
use crate::upstream::{build_fetcher, FetcherSetupError, OriginFetcher};

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_SECS: u64 = 10;

/// Application state injected into handlers. Everything is immutable.
#[derive(Clone)]
pub struct AppState {
    pub prefix: Arc<ProxyPrefix>,
    pub fetcher: Arc<dyn OriginFetcher>,
    pub sanitizer: Arc<HeaderSanitizer>,
    pub rewriter: ContentRewriter,
    pub error_page: ErrorPageFormat,
    pub static_files: Option<ServeDir>,
    pub max_body_size: usize,
    /// Scheme clients reach this listener with, absent `x-forwarded-proto`.
    pub listener_scheme: &'static str,
}

impl AppState {
    pub fn new(config: &ProxyConfig, fetcher: Arc<dyn OriginFetcher>) -> Self {
        Self {
            prefix: Arc::new(config.proxy.proxy_prefix()),
            error_page: config.proxy.error_page_for(fetcher.strategy()),
            fetcher,
            sanitizer: Arc::new(HeaderSanitizer::new(&config.sanitizer)),
            rewriter: ContentRewriter::new(config.rewrite.inject_script_hooks),
            static_files: config.listener.static_dir.as_ref().map(ServeDir::new),
            max_body_size: config.listener.max_body_size,
            listener_scheme: if config.listener.tls.is_some() { "https" } else { "http" },
        }
    }
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server using the fetch strategy named in the configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, FetcherSetupError> {
        let fetcher = build_fetcher(&config)?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Create a server around an already constructed fetcher.
    pub fn with_fetcher(config: ProxyConfig, fetcher: Arc<dyn OriginFetcher>) -> Self {
        let state = AppState::new(&config, fetcher);
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(health_handler))
            .fallback(intercept)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving or for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefix = %self.config.proxy.prefix,
            strategy = %self.config.upstream.strategy,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(recv_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` with the configured certificate until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        let rustls = load_tls_config(tls).await?;
        tracing::info!(
            address = %addr,
            prefix = %self.config.proxy.prefix,
            strategy = %self.config.upstream.strategy,
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            recv_shutdown(shutdown).await;
            drain.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "strategy": state.fetcher.strategy().as_str(),
    }))
}

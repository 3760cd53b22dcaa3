use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use rewrite_proxy::config::{load_config, validate_config, ConfigError, ListenerConfig, ProxyConfig};
use rewrite_proxy::lifecycle::{wait_for_signal, Shutdown};
use rewrite_proxy::observability::{init_logging, metrics};
use rewrite_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "rewrite-proxy")]
#[command(about = "Rewriting web proxy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `[listener] bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    init_logging(&config.observability, cli.json_logs);

    tracing::info!("rewrite-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_file = ?cli.config,
        bind_address = %config.listener.bind_address,
        prefix = %config.proxy.prefix,
        strategy = %config.upstream.strategy,
        tls = config.listener.tls.is_some(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.clone())?;
    let mut serving = tokio::spawn(serve(server, config.listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut serving => {
            // The listener stopped on its own, e.g. the bind failed.
            result??;
            return Ok(());
        }
        _ = wait_for_signal() => {}
    }

    shutdown.trigger();
    serving.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(
    server: HttpServer,
    listener: ListenerConfig,
    shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    match &listener.tls {
        Some(tls) => {
            let addr: SocketAddr = listener
                .bind_address
                .parse()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            server.run_tls(addr, tls, shutdown).await
        }
        None => {
            let tcp = TcpListener::bind(&listener.bind_address).await?;
            server.run(tcp, shutdown).await
        }
    }
}

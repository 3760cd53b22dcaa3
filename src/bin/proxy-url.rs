use clap::{Parser, Subcommand};
use serde_json::Value;

use rewrite_proxy::{decode, ProxyPrefix, TargetUrl};

#[derive(Parser)]
#[command(name = "proxy-url")]
#[command(about = "Build and inspect rewrite-proxy addresses", long_about = None)]
struct Cli {
    /// Path prefix the proxy serves under.
    #[arg(short, long, default_value = "/uv/service/")]
    prefix: String,

    /// Origin of the proxy; makes `encode` print absolute addresses.
    #[arg(short, long)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the proxy address for a target URL
    Encode { target: String },
    /// Print the target URL behind a proxy address or encoded segment
    Decode { address: String },
    /// Check a running proxy's health endpoint
    Check {
        #[arg(default_value = "http://localhost:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut prefix = ProxyPrefix::new(cli.prefix);
    if let Some(origin) = cli.origin {
        prefix = prefix.with_public_origin(origin);
    }

    match cli.command {
        Commands::Encode { target } => {
            let target = TargetUrl::parse(&target)?;
            println!("{}", prefix.address_for(target.as_url()));
        }
        Commands::Decode { address } => {
            println!("{}", decode(segment_of(&prefix, &address))?);
        }
        Commands::Check { url } => {
            let res = reqwest::Client::new()
                .get(format!("{}/healthz", url.trim_end_matches('/')))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Accepts a full address, a prefixed path, or a bare encoded segment.
fn segment_of<'a>(prefix: &ProxyPrefix, address: &'a str) -> &'a str {
    let path = match prefix.public_origin() {
        Some(origin) => address.strip_prefix(origin).unwrap_or(address),
        None => address,
    };
    prefix.strip(path).unwrap_or(path)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

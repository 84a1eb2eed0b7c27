//! SAML → PKCE Bridge - Entry Point

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use saml_pkce_bridge::{config::Config, server::BridgeServer};

#[derive(Parser, Debug)]
#[command(name = "saml-pkce-bridge")]
#[command(about = "Bridge a SAML identity provider to an authorization code + PKCE flow")]
#[command(version)]
struct Cli {
    /// HTTP server port
    #[arg(long, default_value = "3000", env = "PORT")]
    port: u16,

    /// Public base URL of this service (e.g., https://sso.example.com)
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting SAML PKCE bridge");

    let mut config = Config::from_env()?;
    config.port = cli.port;
    if let Some(base_url) = cli.base_url {
        config.saml_issuer = std::env::var("SAML_ISSUER").unwrap_or_else(|_| base_url.clone());
        config.base_url = base_url;
    }

    tracing::info!(config = ?config, "Loaded configuration");

    let server = BridgeServer::new(&config)?;
    server.run_http().await
}

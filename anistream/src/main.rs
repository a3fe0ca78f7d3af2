mod server;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use anistream_api::AppState;
use anistream_core::{
    bootstrap::{build_registry, init_services, load_config},
    logging,
};
use anistream_proxy::ProxyService;

use server::AnistreamServer;

/// Anime source resolution and streaming proxy server
#[derive(Debug, Parser)]
#[command(name = "anistream", version, about)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "ANISTREAM_CONFIG_PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load and validate configuration
    let config = load_config(cli.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("anistream starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Register enabled providers
    let registry = build_registry(&config)?;
    info!(providers = ?registry.kinds(), "Providers registered");

    // 4. Resolver, catalogue and proxy
    let services = init_services(&config, registry);
    let public_base_url = config.public_base_url();
    let proxy = ProxyService::new(
        &public_base_url,
        Duration::from_secs(config.timeouts.proxy_seconds),
        config.proxy.max_playlist_bytes,
    )?;
    info!("Media proxy base: {}", proxy.proxy_base());

    let state = AppState::new(services, proxy, &public_base_url);

    // 5. Serve until shutdown
    AnistreamServer::new(config, state).start().await
}

//! Server lifecycle management
//!
//! Binds the HTTP listener, serves the API router and drains in-flight
//! requests on Ctrl+C or SIGTERM.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use anistream_api::{create_router, AppState};
use anistream_core::Config;

pub struct AnistreamServer {
    config: Config,
    state: AppState,
}

impl AnistreamServer {
    pub const fn new(config: Config, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve HTTP until a shutdown signal arrives
    pub async fn start(self) -> anyhow::Result<()> {
        let http_address = self.config.http_address();
        let http_addr: SocketAddr = http_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid HTTP address '{http_address}': {e}"))?;

        let listener = TcpListener::bind(http_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_addr}: {e}"))?;
        info!("HTTP server listening on {}", http_addr);

        let router = create_router(self.state);
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("HTTP server error: {}", e);
            return Err(e.into());
        }

        info!("HTTP server shut down gracefully");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C, starting graceful shutdown"); }
        () = terminate => { info!("Received SIGTERM, starting graceful shutdown"); }
    }
}

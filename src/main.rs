use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::info;

use cap_oracle::api::{create_router, AppState};
use cap_oracle::config::Config;
use cap_oracle::observability::{init_tracing, MetricsRegistry};
use cap_oracle::rpc::ClusterEndpoints;
use cap_oracle::signer::{AttestationSigner, ServiceSigner};
use cap_oracle::TransactionCoSigner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize tracing
    init_tracing(&config.log_level, config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting cap-oracle"
    );

    // Load the service key once; every signer shares it
    let secret = config
        .signer_secret
        .as_deref()
        .context("signer secret not configured (set SOL_SECRET)")?;
    let signer = Arc::new(ServiceSigner::from_secret_json(secret).context("invalid signer secret")?);
    info!(public_key = %signer.pubkey(), "Service key loaded");

    // Cluster RPC endpoints
    let clusters = ClusterEndpoints::new(config.rpc_urls(), config.rpc_timeout())
        .context("failed to build RPC client")?;

    let settings = config.co_sign_settings();
    info!(
        signer_slot = settings.service_slot.index(),
        broadcast_on_co_sign = settings.broadcast_on_co_sign,
        "Co-signer configured"
    );

    // Create application state
    let state = Arc::new(AppState {
        co_signer: Arc::new(TransactionCoSigner::new(
            signer.clone(),
            Arc::new(clusters),
            settings,
        )),
        attester: AttestationSigner::new(signer),
        metrics: Arc::new(MetricsRegistry::new()),
        start_time: Instant::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cors_max_age: config.cors_max_age(),
    });

    // Create router
    let app = create_router(state);

    // Parse listen address
    let addr: SocketAddr = config.listen_addr.parse()?;

    info!(addr = %addr, "Starting HTTP server");

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    if config.graceful_shutdown {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        axum::serve(listener, app).await?;
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}

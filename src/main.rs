use anyhow::{Context, Result};
use clap::Parser;
use homewire::{
    api::{create_app, AppState},
    config::load_config_or_default,
    coordinator::Coordinator,
    storage::Database,
    subscription::BroadcastHub,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Smart-home state tracker with live event streaming
#[derive(Parser, Debug)]
#[command(name = "homewire", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "homewire.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homewire=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    info!("Homewire starting...");

    let config = load_config_or_default(&cli.config)
        .context("Failed to load configuration")?
        .with_env_overrides();

    let db = Database::open(&config.storage.database_path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.storage.database_path.display()
        )
    })?;

    let coordinator = Arc::new(Coordinator::new(
        Arc::new(db),
        Arc::new(BroadcastHub::with_capacity(
            config.subscription.observer_queue_capacity,
        )),
    ));

    let seeded = coordinator
        .seed_default_sensors()
        .context("Failed to seed default sensors")?;
    info!(seeded, "Sensor collection ready");

    let app = create_app(Arc::new(AppState {
        coordinator,
        default_event_limit: config.events.default_list_limit,
    }));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Homewire stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! Nexus Analytics — event analytics backend serving cohort retention.
//!
//! Main entry point that loads configuration, builds the analytics store,
//! and starts the HTTP server.

use clap::Parser;
use nexus_api::ApiServer;
use nexus_core::config::{AppConfig, StoreBackend};
use nexus_store::{AnalyticsStore, ClickHouseStore, MemoryStore};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "nexus-analytics")]
#[command(about = "Event analytics backend serving cohort retention")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (default: ./nexus.toml if present)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "NEXUS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Analytics store backend: memory or clickhouse (overrides config)
    #[arg(long)]
    store_backend: Option<StoreBackend>,

    /// JSON fixture to load into the memory store
    #[arg(long)]
    fixture: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nexus_analytics=info,nexus_api=info,nexus_reporting=info,nexus_store=info,tower_http=info"
                    .into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Nexus Analytics starting up");

    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(backend) = cli.store_backend {
        config.store.backend = backend;
    }
    if let Some(path) = cli.fixture {
        config.store.fixture_path = Some(path);
    }

    info!(
        instance_id = %config.instance_id,
        http_port = config.api.http_port,
        backend = ?config.store.backend,
        sessions = config.auth.sessions.len(),
        "Configuration loaded"
    );
    if config.auth.sessions.is_empty() {
        warn!("No sessions configured; every retention request will be rejected as unauthenticated");
    }

    let store = build_store(&config).await?;
    let api_server = ApiServer::new(config.clone(), store);

    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics().await {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("Nexus Analytics is ready to serve traffic");

    // Blocks until shutdown
    api_server.start_http().await?;

    Ok(())
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn AnalyticsStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            if let Some(path) = &config.store.fixture_path {
                store.load_fixture(path)?;
            }
            info!(projects = store.project_count(), "Using in-memory analytics store");
            Ok(Arc::new(store))
        }
        StoreBackend::ClickHouse => {
            let store = ClickHouseStore::connect(&config.clickhouse).await?;
            Ok(Arc::new(store))
        }
    }
}

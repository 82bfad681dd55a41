//! Donor CRM — donor, donation and segment management service.
//!
//! Main entry point that loads configuration and starts the server.

use clap::Parser;
use donor_api::ApiServer;
use donor_core::config::AppConfig;
use donor_management::CrmStore;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "donor-crm")]
#[command(about = "Donor relationship management service")]
#[command(version)]
struct Cli {
    /// Bind address (overrides config)
    #[arg(long, env = "DONOR_CRM__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "DONOR_CRM__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port (overrides config)
    #[arg(long, env = "DONOR_CRM__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Start with an empty store instead of demo donors
    #[arg(long, default_value_t = false)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "donor_crm=info,donor_management=info,donor_segmentation=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Donor CRM starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if cli.no_seed {
        config.store.seed_demo_data = false;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        seed_demo_data = config.store.seed_demo_data,
        "Configuration loaded"
    );

    let store = CrmStore::with_audit_capacity(config.store.audit_log_capacity);
    let store = if config.store.seed_demo_data {
        Arc::new(store.seeded())
    } else {
        Arc::new(store)
    };

    let api_server = ApiServer::new(config.clone(), store);

    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics() {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("Donor CRM is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}

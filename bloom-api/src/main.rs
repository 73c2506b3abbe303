//! bloom-api - Bloom Planner entitlement & transactional workflow engine
//!
//! Resolves subscription entitlements, orchestrates payment checkout
//! sessions, and tracks asynchronous request records through their status
//! lifecycle.

use anyhow::Result;
use bloom_api::assistant::{Assistant, HttpAssistant, UnconfiguredAssistant};
use bloom_api::checkout::{PaymentGateway, UnconfiguredGateway};
use bloom_api::stripe::StripeClient;
use bloom_api::{build_router, AppState};
use bloom_common::config::{CliOverrides, ServiceConfig};
use bloom_common::db::init_database;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "bloom-api", about = "Bloom Planner workflow engine")]
struct Args {
    /// Database file path
    #[arg(long, env = "BLOOM_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    bind: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServiceConfig::resolve(CliOverrides {
        database_path: args.database_path,
        bind: args.bind,
        port: args.port,
    });

    // Initialize tracing subscriber; RUST_LOG wins over the configured
    // filter when set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Bloom Planner API (bloom-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    config.ensure_data_dir()?;
    let pool = init_database(&config.database_path).await?;

    // Recover records orphaned by a previous crash: anything still
    // non-terminal past the deadline will never advance on its own
    let deadline = chrono::Duration::minutes(config.stuck_record_deadline_minutes);
    let swept = bloom_api::tracker::fail_stuck_records(&pool, deadline).await?;
    if swept > 0 {
        info!(swept, "Swept stuck async records on startup");
    }

    let gateway: Arc<dyn PaymentGateway> = match config.stripe_secret_key.clone() {
        Some(secret_key) => Arc::new(StripeClient::new(secret_key)?),
        None => {
            warn!("No Stripe secret key configured; checkout requests will fail");
            Arc::new(UnconfiguredGateway)
        }
    };

    let assistant: Arc<dyn Assistant> = match config.assistant_url.clone() {
        Some(endpoint) => Arc::new(HttpAssistant::new(endpoint)?),
        None => {
            warn!("No assistant endpoint configured; chat records will fail processing");
            Arc::new(UnconfiguredAssistant)
        }
    };

    let state = AppState::new(pool, gateway, assistant);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("bloom-api listening on http://{}", config.bind_addr());
    info!("Health check: http://{}/health", config.bind_addr());

    axum::serve(listener, app).await?;

    Ok(())
}

//! REST API Server for the Olist Growth Dashboard
//!
//! Usage:
//!   ./target/release/api_server [--config olist.toml] [--port PORT]
//!
//! REST endpoints:
//!   GET  /api/v1/health                    - Health check
//!   GET  /api/v1/dashboard                 - All three views at once
//!   GET  /api/v1/overview                  - Business health
//!   GET  /api/v1/friction                  - Delivery friction diagnosis
//!   GET  /api/v1/segments                  - Segment summaries
//!   GET  /api/v1/segments/:label           - One segment with its audience map
//!   GET  /api/v1/segments/:label/strategy  - Strategy card of one segment
//!   GET  /api/v1/clusters                  - Raw cluster profiles
//!   POST /api/v1/cache/invalidate          - Drop cached datasets

use anyhow::{Context, Result};
use clap::Parser;
use olist_growth::api::{create_router, DashboardService};
use olist_growth::config::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "api_server")]
#[command(about = "Serve the growth dashboard views over REST")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides [server].port)
    #[arg(long)]
    port: Option<u16>,
}

fn print_banner(config: &AppConfig, port: u16) {
    println!("============================================================");
    println!("         OLIST GROWTH DASHBOARD API SERVER");
    println!("============================================================");
    println!();
    println!("  Port:     {}", port);
    println!("  REST:     http://localhost:{}/api/v1/", port);
    println!("  Orders:   {}", config.data.orders_path.display());
    println!("  Clusters: {}", config.data.clusters_path.display());
    println!("  Policy:   {}", config.segmentation.policy.kind());
    println!();
    println!("REST Endpoints:");
    println!("  GET  /api/v1/health                    Health check");
    println!("  GET  /api/v1/dashboard                 All views");
    println!("  GET  /api/v1/overview                  Business health");
    println!("  GET  /api/v1/friction                  Delivery friction");
    println!("  GET  /api/v1/segments                  Segment summaries");
    println!("  GET  /api/v1/segments/:label           Segment detail");
    println!("  GET  /api/v1/segments/:label/strategy  Strategy card");
    println!("  GET  /api/v1/clusters                  Cluster profiles");
    println!("  POST /api/v1/cache/invalidate          Reload datasets");
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).context("invalid configuration")?;
    let port = args.port.unwrap_or(config.server.port);

    print_banner(&config, port);

    let service = Arc::new(DashboardService::new(config));
    let app = create_router(service);

    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

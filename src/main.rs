//! Olist Growth Dashboard (terminal)
//!
//! Run: ./target/release/olist_growth [section] [--config olist.toml]
//! Sections: all, health, friction, segments, clusters

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use olist_growth::cache::DatasetCache;
use olist_growth::config::AppConfig;
use olist_growth::dashboard::{audience_map, build_segmentation};
use olist_growth::insights::{business_health, friction_diagnosis};
use olist_growth::{report, DashboardError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    All,
    Health,
    Friction,
    Segments,
    Clusters,
}

#[derive(Parser, Debug)]
#[command(name = "olist_growth")]
#[command(about = "Growth and retention dashboard for the Olist marketplace")]
struct Args {
    /// Section of the dashboard to render
    #[arg(value_enum, default_value = "all")]
    section: Section,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the orders table path
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Override the customer cluster table path
    #[arg(long)]
    clusters: Option<PathBuf>,
}

fn run(args: &Args) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref()).context("invalid configuration")?;
    if let Some(orders) = &args.orders {
        config.data.orders_path = orders.clone();
        config.data.orders_fallback_path = None;
    }
    if let Some(clusters) = &args.clusters {
        config.data.clusters_path = clusters.clone();
    }

    let cache = DatasetCache::new();
    let data = cache.get_or_load(&config.data)?;
    info!(
        "Loaded {} order lines and {} customers",
        data.orders.len(),
        data.clusters.len()
    );

    report::print_banner("OLIST GROWTH DASHBOARD");

    let section = args.section;
    if matches!(section, Section::All | Section::Health) {
        report::render_health(&business_health(&data.orders));
    }
    if matches!(section, Section::All | Section::Friction) {
        report::render_friction(&friction_diagnosis(&data.orders, &config.friction));
    }
    if matches!(section, Section::All | Section::Segments | Section::Clusters) {
        let (view, classified) = build_segmentation(&data, &config)?;
        if matches!(section, Section::All | Section::Segments) {
            let points = audience_map(&classified, view.monetary_cap);
            report::render_segments(&view, &points);
        }
        if matches!(section, Section::All | Section::Clusters) {
            report::render_clusters(&view);
        }
    }

    report::print_footer();
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            match e.downcast_ref::<DashboardError>() {
                Some(DashboardError::DatasetNotFound { .. }) => {
                    eprintln!("\n⚠ {}", e);
                    eprintln!("  Generate a sample with ./target/release/generate_synthetic or point --orders/--clusters at the processed files.");
                }
                Some(DashboardError::UnmappedCluster { .. }) => {
                    eprintln!("\n⚠ {}", e);
                    eprintln!("  Extend [segmentation.policy] mapping or set a fallback label.");
                }
                _ => eprintln!("\nError: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

//! Synthetic data generator for the Olist growth dashboard
//!
//! Writes an order table and a customer cluster table shaped like the
//! processed Olist exports: four behavioural clusters (recent, at-risk,
//! sleeping, VIP) with review scores that drop when delivery runs late.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --customers <N>    Number of customers (default: 5000)
//!   --late-rate <F>    Late delivery probability outside the at-risk cluster (default: 0.06)
//!   --seed <N>         Random seed for reproducibility (optional)
//!   --output-dir <DIR> Output directory (default: data)
//!   --no-gzip          Write the order table as plain CSV

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use csv::WriterBuilder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate synthetic Olist order and cluster tables")]
struct Args {
    /// Number of customers to generate
    #[arg(long, default_value = "5000")]
    customers: usize,

    /// Probability of a late delivery outside the at-risk cluster
    #[arg(long, default_value = "0.06")]
    late_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Directory receiving olist_processed.csv[.gz] and olist_clusters.csv
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,

    /// Write the order table as plain CSV instead of gzip
    #[arg(long)]
    no_gzip: bool,
}

#[derive(Debug, Clone, Serialize)]
struct OrderRow {
    order_id: String,
    order_purchase_timestamp: String,
    price: f64,
    diferencia_estimada_dias: Option<f64>,
    review_score: Option<u8>,
    order_status: &'static str,
    customer_state: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct ClusterRow {
    customer_unique_id: String,
    recency: f64,
    frequency: f64,
    monetary: f64,
    avg_review_score: f64,
    cluster: i64,
}

/// Shape of one behavioural cluster
struct ClusterShape {
    id: i64,
    name: &'static str,
    share: f64,
    recency_days: (i64, i64),
    orders: (u32, u32),
    ticket: (f64, f64),
    late_rate: Option<f64>,
}

static CLUSTERS: [ClusterShape; 4] = [
    ClusterShape {
        id: 0,
        name: "recent",
        share: 0.40,
        recency_days: (5, 200),
        orders: (1, 1),
        ticket: (30.0, 220.0),
        late_rate: None,
    },
    ClusterShape {
        id: 1,
        name: "at-risk",
        share: 0.15,
        recency_days: (60, 500),
        orders: (1, 1),
        ticket: (40.0, 260.0),
        late_rate: Some(0.55),
    },
    ClusterShape {
        id: 2,
        name: "sleeping",
        share: 0.40,
        recency_days: (330, 720),
        orders: (1, 1),
        ticket: (30.0, 220.0),
        late_rate: None,
    },
    ClusterShape {
        id: 3,
        name: "vip",
        share: 0.05,
        recency_days: (20, 450),
        orders: (2, 5),
        ticket: (120.0, 600.0),
        late_rate: None,
    },
];

/// Customer state weights, roughly following the marketplace's order volume
const STATES: [(&str, f64); 12] = [
    ("SP", 0.42),
    ("RJ", 0.13),
    ("MG", 0.12),
    ("RS", 0.055),
    ("PR", 0.05),
    ("SC", 0.037),
    ("BA", 0.034),
    ("DF", 0.021),
    ("ES", 0.02),
    ("GO", 0.02),
    ("PE", 0.016),
    ("CE", 0.013),
];

fn reference_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2018, 9, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn pick_cluster(rng: &mut impl Rng) -> &'static ClusterShape {
    let mut roll = rng.gen::<f64>();
    for shape in &CLUSTERS {
        if roll < shape.share {
            return shape;
        }
        roll -= shape.share;
    }
    &CLUSTERS[0]
}

fn pick_state(rng: &mut impl Rng) -> &'static str {
    let total: f64 = STATES.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen::<f64>() * total;
    for (state, weight) in STATES {
        if roll < weight {
            return state;
        }
        roll -= weight;
    }
    STATES[0].0
}

fn pick_status(rng: &mut impl Rng) -> &'static str {
    let roll = rng.gen::<f64>();
    if roll < 0.97 {
        "delivered"
    } else if roll < 0.983 {
        "shipped"
    } else if roll < 0.99 {
        "canceled"
    } else if roll < 0.995 {
        "invoiced"
    } else {
        "processing"
    }
}

/// Days against the estimated delivery date; positive means late
fn delivery_deviation(late: bool, rng: &mut impl Rng) -> f64 {
    if late {
        rng.gen_range(1.0..25.0_f64).round()
    } else {
        // sum of uniforms: centred near -12 with a soft tail
        let spread: f64 = (0..3).map(|_| rng.gen_range(-8.0..8.0_f64)).sum();
        (-12.0 + spread).min(0.0).round()
    }
}

fn review_for(deviation: Option<f64>, rng: &mut impl Rng) -> u8 {
    let roll = rng.gen::<f64>();
    match deviation {
        Some(d) if d > 0.0 => {
            if roll < 0.55 {
                1
            } else if roll < 0.75 {
                2
            } else if roll < 0.88 {
                3
            } else {
                4
            }
        }
        _ => {
            if roll < 0.58 {
                5
            } else if roll < 0.82 {
                4
            } else if roll < 0.92 {
                3
            } else if roll < 0.96 {
                2
            } else {
                1
            }
        }
    }
}

fn generate_id(rng: &mut impl Rng) -> String {
    format!("{:032x}", rng.gen::<u128>())
}

fn generate_customer(
    shape: &ClusterShape,
    args: &Args,
    rng: &mut impl Rng,
    orders: &mut Vec<OrderRow>,
) -> ClusterRow {
    let customer_id = generate_id(rng);
    let state = pick_state(rng);
    let recency = rng.gen_range(shape.recency_days.0..=shape.recency_days.1);
    let frequency = rng.gen_range(shape.orders.0..=shape.orders.1);
    let late_rate = shape.late_rate.unwrap_or(args.late_rate);

    let mut monetary = 0.0;
    let mut reviews = Vec::new();
    let mut days_ago = recency;
    for _ in 0..frequency {
        let purchased_at = reference_time() - Duration::days(days_ago)
            + Duration::seconds(rng.gen_range(0..86_400));
        let price = (rng.gen_range(shape.ticket.0..shape.ticket.1) * 100.0_f64).round() / 100.0;
        let status = pick_status(rng);
        let deviation = (status == "delivered").then(|| delivery_deviation(rng.gen::<f64>() < late_rate, rng));
        let review = review_for(deviation, rng);

        monetary += price;
        reviews.push(review as f64);
        orders.push(OrderRow {
            order_id: generate_id(rng),
            order_purchase_timestamp: purchased_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            price,
            diferencia_estimada_dias: deviation,
            review_score: Some(review),
            order_status: status,
            customer_state: state,
        });

        days_ago += rng.gen_range(15..120);
    }

    ClusterRow {
        customer_unique_id: customer_id,
        recency: recency as f64,
        frequency: frequency as f64,
        monetary: (monetary * 100.0).round() / 100.0,
        avg_review_score: reviews.iter().sum::<f64>() / reviews.len().max(1) as f64,
        cluster: shape.id,
    }
}

fn write_rows<W: Write, T: Serialize>(sink: W, rows: &[T]) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(sink);
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("failed to flush CSV: {}", e.error()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("🔧 Synthetic Olist Data Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Customers:        {}", args.customers);
    println!("Late rate:        {:.1}%", args.late_rate * 100.0);
    println!("Output dir:       {}", args.output_dir.display());
    println!("Gzip orders:      {}", !args.no_gzip);
    if let Some(seed) = args.seed {
        println!("Random seed:      {}", seed);
    }
    println!();

    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    std::fs::create_dir_all(&args.output_dir)?;

    println!("🏭 Generating customers...");
    let mut orders = Vec::new();
    let mut customers = Vec::with_capacity(args.customers);
    for i in 0..args.customers {
        let shape = pick_cluster(&mut rng);
        customers.push(generate_customer(shape, &args, &mut rng, &mut orders));

        if (i + 1) % 10000 == 0 {
            println!("   Generated {}/{} customers...", i + 1, args.customers);
        }
    }

    let orders_path = if args.no_gzip {
        let path = args.output_dir.join("olist_processed.csv");
        write_rows(File::create(&path)?, &orders)?.flush()?;
        path
    } else {
        let path = args.output_dir.join("olist_processed.csv.gz");
        let encoder = GzEncoder::new(File::create(&path)?, Compression::default());
        write_rows(encoder, &orders)?.finish()?;
        path
    };

    let clusters_path = args.output_dir.join("olist_clusters.csv");
    write_rows(File::create(&clusters_path)?, &customers)?.flush()?;

    println!("\n✅ Generation complete!");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Order lines:       {:>8}", orders.len());
    println!("Customers:         {:>8}", customers.len());
    for shape in &CLUSTERS {
        let count = customers.iter().filter(|c| c.cluster == shape.id).count();
        println!("  cluster {} ({:9}) {:>8}", shape.id, shape.name, count);
    }
    println!("Orders file:       {}", orders_path.display());
    println!("Clusters file:     {}", clusters_path.display());

    Ok(())
}

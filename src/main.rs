//! Freightflow CLI
//!
//! Thin front-end over the route engine: loads the transport tables,
//! runs one planning request, and prints the recommended routes.

use anyhow::{Context, Result};
use clap::Parser;
use freightflow::container::ContainerTable;
use freightflow::data::{FlightTable, LocationTable, ShippingTable};
use freightflow::eval::GoodsType;
use freightflow::{Config, PlanRequest, Priority, RouteOption, RoutePlanner};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "freightflow", about = "Multi-modal freight route recommendations")]
struct Cli {
    /// Source city name or "lon,lat" coordinates.
    source: String,

    /// Destination city name or "lon,lat" coordinates.
    destination: String,

    /// Optimization priority: cost, time, eco, or balanced.
    #[arg(long, default_value = "balanced")]
    priority: String,

    /// Cargo type menu index: 1 standard, 2 perishable, 3 hazardous,
    /// 4 fragile, 5 oversized, 6 high-value.
    #[arg(long, default_value_t = 1)]
    goods_type: u32,

    /// Cargo weight in kg.
    #[arg(long, default_value_t = 100.0)]
    weight: f64,

    /// Flight lanes CSV.
    #[arg(long, default_value = "cargo_flights.csv")]
    flights: PathBuf,

    /// Shipping lanes CSV.
    #[arg(long, default_value = "cargo_shipping.csv")]
    shipping: PathBuf,

    /// Optional location database CSV; seeds the geocoder cache.
    #[arg(long)]
    locations: Option<PathBuf>,

    /// Optional container specification CSV.
    #[arg(long)]
    containers: Option<PathBuf>,

    /// Emit the full result as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let flights = FlightTable::load(&cli.flights)
        .with_context(|| format!("loading flight table {}", cli.flights.display()))?;
    let shipping = ShippingTable::load(&cli.shipping)
        .with_context(|| format!("loading shipping table {}", cli.shipping.display()))?;
    info!(
        flights = flights.0.len(),
        shipping_lanes = shipping.0.len(),
        "transport tables loaded"
    );

    let containers = match &cli.containers {
        Some(path) => match ContainerTable::load(path) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(error = %e, "container table unavailable, skipping annotations");
                None
            }
        },
        None => None,
    };

    let planner = RoutePlanner::new(config);

    if let Some(path) = &cli.locations {
        match LocationTable::load(path) {
            Ok(table) => {
                table.seed_geocoder(planner.geocoder());
                info!(locations = table.0.len(), "geocoder seeded from location table");
            }
            Err(e) => warn!(error = %e, "location table unavailable, relying on live geocoding"),
        }
    }

    let request = PlanRequest {
        source: cli.source,
        destination: cli.destination,
        priority: cli.priority.parse::<Priority>()?,
        goods_type: GoodsType::from_index(cli.goods_type),
        cargo_weight: cli.weight,
    };

    let options = planner.recommend(&flights, &shipping, &request).await?;

    if options.is_empty() {
        println!("No routes found between the given source and destination.");
        return Ok(());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    for (rank, option) in options.iter().enumerate() {
        print_option(rank + 1, option, request.cargo_weight, containers.as_ref());
    }
    Ok(())
}

fn print_option(
    rank: usize,
    option: &RouteOption,
    cargo_weight: f64,
    containers: Option<&ContainerTable>,
) {
    let data = &option.data;
    println!("\nRoute option {}: {}", rank, option.overview.join(" -> "));
    println!("  Total cost:      {:.2}", data.total_cost);
    println!("  Total time:      {:.2} hours", data.total_time);
    println!(
        "  Total distance:  {:.2} km (road segments only)",
        data.total_distance
    );
    println!("  Total emissions: {:.3} tonnes CO2", data.total_emissions);
    println!("  Cargo type:      {}", data.goods_type);

    for segment in &data.segments {
        println!(
            "    {} -> {} ({}): {:.2} km, {:.2} hr, cost {:.2}, {:.3} t CO2",
            segment.start,
            segment.end,
            segment.mode,
            segment.distance_km,
            segment.time_hr,
            segment.total_segment_cost,
            segment.co2_emissions,
        );
        if let Some(choice) = containers.and_then(|t| t.classify(segment.mode, cargo_weight)) {
            if choice.exceeded {
                println!(
                    "      container: {} (cargo exceeds {} kg capacity)",
                    choice.container_type, choice.capacity_kg
                );
            } else {
                println!("      container: {}", choice.container_type);
            }
        }
    }
}

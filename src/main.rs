use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use oglike_core::catalog::CatalogData;
use oglike_core::config::EngineConfig;
use oglike_core::fleet::formulas;
use oglike_core::model::{Coordinate, PlanetShape};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oglike")]
#[command(about = "Inspection tooling for the game engine formulas and catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Distance between two coordinates (`galaxy:system:position[:kind]`)
    Distance { from: String, to: String },
    /// Seconds needed for a trip
    FlightTime {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value_t = 1.0)]
        speed_ratio: f64,
        /// Speed of the slowest ship
        #[arg(long)]
        slowest: f64,
    },
    /// Shape of the planet generated at a coordinate
    PlanetShape {
        coordinate: String,
        #[arg(long)]
        homeworld: bool,
    },
    /// Loads and checks a JSON catalog
    Catalog {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn coordinate(raw: &str) -> Result<Coordinate> {
    raw.parse().with_context(|| format!("invalid coordinate '{}'", raw))
}

fn main() -> Result<()> {
    let config = EngineConfig::from_env().map_err(|e| anyhow!(e))?;
    config.validate().map_err(|e| anyhow!(e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Distance { from, to } => {
            println!("{}", formulas::distance(&coordinate(&from)?, &coordinate(&to)?));
        }
        Command::FlightTime {
            from,
            to,
            speed_ratio,
            slowest,
        } => {
            if !(speed_ratio > 0.0 && speed_ratio <= 1.0) || slowest <= 0.0 {
                return Err(anyhow!("speed ratio must be in (0, 1] and the slowest speed positive"));
            }
            let distance = formulas::distance(&coordinate(&from)?, &coordinate(&to)?);
            println!("{:.3}", formulas::flight_time(distance, speed_ratio, slowest));
        }
        Command::PlanetShape { coordinate: raw, homeworld } => {
            let shape = PlanetShape::generate(&coordinate(&raw)?);
            let output = serde_json::json!({
                "name": if homeworld { "homeworld" } else { "planet" },
                "fields": shape.fields,
                "diameter": shape.diameter,
                "min_temperature": shape.min_temperature,
                "max_temperature": shape.max_temperature,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Catalog { path } => {
            let path = path
                .or(config.catalog_path.clone())
                .ok_or_else(|| anyhow!("no catalog given, use --path or {}", EngineConfig::CATALOG_VAR))?;
            let catalog = CatalogData::from_file(&path)
                .and_then(CatalogData::into_catalog)
                .with_context(|| format!("cannot load catalog {}", path.display()))?;

            println!("resources:    {}", catalog.resources().len());
            println!("buildings:    {}", catalog.buildings().len());
            println!("technologies: {}", catalog.technologies().len());
            println!("ships:        {}", catalog.ships().len());
            println!("defenses:     {}", catalog.defenses().len());
            println!("objectives:   {}", catalog.objectives().len());
        }
    }
    Ok(())
}

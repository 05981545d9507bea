mod nearby;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use medfinder_core::{DistanceOption, FacilityCategory};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "medfinder")]
#[command(about = "Find medical facilities near you")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List facilities ranked by distance from your location
    Nearby {
        /// Latitude of a manually entered location
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude of a manually entered location
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
        /// Case-insensitive text matched against name and address
        #[arg(long)]
        search: Option<String>,
        /// Only show these categories (repeatable, e.g. pharmacy, nursing-home)
        #[arg(long = "category")]
        categories: Vec<FacilityCategory>,
        /// Search radius: 1km, 3km, 5km or all
        #[arg(long, default_value = "all")]
        within: DistanceOption,
        /// Catalog YAML file (defaults to MEDFINDER_CATALOG_PATH)
        #[arg(long, conflicts_with = "api")]
        catalog: Option<PathBuf>,
        /// Base URL of an amenity data service (defaults to MEDFINDER_CATALOG_URL)
        #[arg(long)]
        api: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the facility categories
    Categories,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = medfinder_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    let plain = config.env.plain_logs();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(!plain)
        .with_target(!plain)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Nearby {
            lat,
            lon,
            search,
            categories,
            within,
            catalog,
            api,
            json,
        }) => {
            let args = nearby::NearbyArgs {
                manual: lat.zip(lon),
                search: search.unwrap_or_default(),
                categories,
                within,
                catalog,
                api,
                json,
            };
            nearby::run_nearby(&config, args).await?;
        }
        Some(Commands::Categories) => print_categories(),
        None => println!("medfinder: run `medfinder nearby` or `medfinder --help`"),
    }

    Ok(())
}

fn print_categories() {
    println!("{:<14}LABEL", "CATEGORY");
    for category in FacilityCategory::ALL {
        println!("{:<14}{}", category.as_str(), category.label());
    }
}

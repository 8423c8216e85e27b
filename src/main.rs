use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use twd97geo::config::Config;
use twd97geo::geocode::create_geocoding_service;
use twd97geo::projection::PlanarCoordinate;
use twd97geo::resolve::resolve_rows;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Convert TWD97 coordinates to WGS84 and look up their addresses"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize with a default config file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,

        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Convert TWD97 coordinates to WGS84 latitude/longitude
    Convert {
        /// One or more coordinates written as "(x, y)"
        #[arg(value_name = "COORD", required = true, allow_hyphen_values = true)]
        coordinates: Vec<PlanarCoordinate>,
    },

    /// Convert TWD97 coordinates and reverse geocode them into addresses
    Address {
        /// One or more coordinates written as "(x, y)"
        #[arg(value_name = "COORD", required = true, allow_hyphen_values = true)]
        coordinates: Vec<PlanarCoordinate>,

        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Language for place names (overrides the config)
        #[arg(short, long, value_name = "TAG")]
        language: Option<String>,

        /// Use built-in sample data instead of the geocoding service
        #[arg(long)]
        offline: bool,

        /// Print one JSON object per coordinate instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { force, config } => {
            init_config(config, *force)?;
            Ok(())
        }
        Commands::Convert { coordinates } => {
            for coordinate in coordinates {
                println!("TWD97: {coordinate}");
                println!("WGS84: {}", coordinate.to_wgs84());
            }
            Ok(())
        }
        Commands::Address {
            coordinates,
            config,
            language,
            offline,
            json,
        } => {
            let config_path = Config::get_config_path(config);
            let config_data = if config.is_some() {
                Config::load_from_file(&config_path)?
            } else {
                Config::load_or_default(&config_path)?
            };
            let language = language.as_deref().unwrap_or(&config_data.language);

            let service = create_geocoding_service(&config_data, *offline)
                .context("Failed to create geocoding service")?;

            for resolved in resolve_rows(&service, coordinates, language).await {
                if *json {
                    println!("{}", serde_json::to_string(&resolved)?);
                    continue;
                }
                println!("TWD97: {}", resolved.coordinate);
                println!("對應 WGS84 經緯度: {}", resolved.geographic);
                println!("地址: {}", resolved.address);
            }

            Ok(())
        }
    }
}

fn init_config(config_path_opt: &Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = Config::get_config_path(config_path_opt);

    if config_path.exists() && !force {
        println!("Config file already exists at {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = Config::default();
    config
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!("Created config file at {}", config_path.display());
    Ok(())
}

use crate::server;
use clap::{Args, Parser, Subcommand};
use rorstay::config::AppConfig;
use rorstay::error::AppError;
use rorstay::geocoding::{geocoder_from_config, Geocoder};
use rorstay::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "RoR Stay",
    about = "Run the RoR Stay listing service or query its geocoder from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Resolve an address through the configured geocoder and print its coordinates
    Geocode(GeocodeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Load sample listings from a CSV file before accepting requests
    #[arg(long, value_name = "CSV")]
    pub(crate) seed: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct GeocodeArgs {
    /// Full postal address, e.g. "1 Main St, Springfield, IL 62701"
    pub(crate) address: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Geocode(args) => geocode(args).await,
    }
}

async fn geocode(args: GeocodeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let geocoder = geocoder_from_config(&config.maps)?;
    match geocoder.geocode(&args.address).await? {
        Some(point) => println!(
            "{:.6},{:.6} ({})",
            point.latitude(),
            point.longitude(),
            geocoder.inner().name()
        ),
        None => println!("no match for '{}'", args.address),
    }
    Ok(())
}

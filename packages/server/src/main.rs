#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk map server binary.

use std::path::PathBuf;

use clap::Parser;
use risk_map_server::ServerError;
use risk_map_server::config::{AppConfig, CliOverrides};

#[derive(Parser)]
#[command(name = "risk_map_server", about = "Risk map data-collection server")]
struct Cli {
    /// Prompt for settings before starting
    #[arg(long)]
    interactive: bool,

    /// Run against an in-memory store seeded from this CSV file
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Listen address
    #[arg(long)]
    bind: Option<String>,
}

#[actix_web::main]
async fn main() -> Result<(), ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    config.apply_cli(CliOverrides {
        seed: cli.seed,
        port: cli.port,
        bind: cli.bind,
    });

    if cli.interactive {
        return risk_map_server::interactive::run(config).await;
    }

    risk_map_server::run_server(config).await
}

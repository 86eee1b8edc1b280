//! coolmaster Simulator Binary
//!
//! Serves a simulated controller command shell over TCP.

use std::sync::Arc;

use clap::Parser;
use coolmaster::sim::{SimServer, UnitBank};
use coolmaster::TemperatureUnit;
use tracing_subscriber::{fmt, EnvFilter};

/// Simulated CoolMaster controller
#[derive(Parser, Debug)]
#[command(name = "coolmaster-sim")]
#[command(about = "Simulated CoolMaster controller for local testing")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:10102")]
    listen: String,

    /// Unit ids to simulate
    #[arg(short, long, value_delimiter = ',', default_value = "L1.100,L1.101")]
    units: Vec<String>,

    /// Report temperatures in Fahrenheit
    #[arg(long)]
    fahrenheit: bool,

    /// Shell prompt
    #[arg(long, default_value = ">")]
    prompt: String,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,coolmaster=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("coolmaster simulator v{}", coolmaster::VERSION);
    tracing::info!("Units: {}", args.units.join(", "));

    let scale = if args.fahrenheit {
        TemperatureUnit::Fahrenheit
    } else {
        TemperatureUnit::Celsius
    };
    let bank = Arc::new(UnitBank::new(args.units, Some(scale)));

    let server = match SimServer::bind(&args.listen, bank) {
        Ok(s) => s.with_prompt(args.prompt),
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Simulator error: {}", e);
        std::process::exit(1);
    }
}

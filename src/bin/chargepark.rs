//! Chargepark - run the charge park and a car on one in-process bus.
//!
//! The charger, its monitor and the status light share one driver; the car
//! has its own. Press Enter to plug the car in or out. The charging goal is
//! set through the configuration endpoint:
//!
//! ```text
//! curl -X POST localhost:8000/ -H 'content-type: application/json' \
//!      -d '{"percentage": 20, "goal": 80}'
//! ```

use anyhow::{Context, Result};
use chargepark::bus::InMemoryBus;
use chargepark::config::ParkConfig;
use chargepark::logging::init_logging;
use chargepark::notify::ConsoleIndicator;
use chargepark::park::{dashboard_reporter, CarStation, ChargePark};
use chargepark::{web, Trigger};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "chargepark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Do not serve the charger configuration endpoint
    #[arg(long)]
    no_api: bool,
}

fn load_config(path: Option<PathBuf>) -> Result<ParkConfig> {
    match path {
        Some(path) => ParkConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(ParkConfig::default()),
    }
}

fn prompt(car: &CarStation) {
    println!("Press enter to {}", car.next_toggle().name());
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config)?;
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    init_logging(&config.logging);

    let bus = Arc::new(InMemoryBus::new());
    let reporter = dashboard_reporter(&config.dashboard, &Handle::current())
        .context("Failed to start the dashboard reporter")?;
    let park = ChargePark::start(&config, bus.clone(), reporter, ConsoleIndicator::default())
        .context("Failed to start the charge park")?;
    let car = Arc::new(CarStation::start(&config, bus.clone()).context("Failed to start the car")?);

    if !args.no_api {
        let addr = config.config_api_addr()?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind configuration endpoint on {addr}"))?;
        let app = web::router(park.api_state());
        info!(%addr, "Configuration endpoint listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "Configuration endpoint stopped");
            }
        });
    }

    let operator = {
        let car = Arc::clone(&car);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            prompt(&car);
            while let Ok(Some(_)) = lines.next_line().await {
                let sent = car.toggle();
                info!(trigger = sent.name(), "Operator toggled the plug");
                prompt(&car);
            }
        })
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Received Ctrl+C");
        }
        _ = operator => {
            info!("Operator input closed");
        }
    }

    info!("Shutting down...");
    car.shutdown();
    park.shutdown();
    bus.close();
    Ok(())
}

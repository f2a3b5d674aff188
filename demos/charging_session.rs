//! Charging Session
//!
//! This example plugs a car into the charge park, sets a charging goal and
//! lets the charger run to completion, all over one in-memory bus.
//!
//! Key concepts:
//! - Two drivers (car and charge park) meeting only on the bus
//! - Run-to-completion self-triggers (`setup_success`, `charging_finished`)
//! - A repeating timer driving the charging ticks
//! - Status reports and indicator colours as output sinks
//!
//! Run with: cargo run --example charging_session

use chargepark::bus::{Bus, InMemoryBus, Message};
use chargepark::config::ParkConfig;
use chargepark::domain::{ChargerTrigger, CHARGER_ID};
use chargepark::notify::{MemoryIndicator, MemoryReporter};
use chargepark::{Args, CarStation, ChargePark};
use std::sync::Arc;
use std::time::Duration;

async fn pause() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::main]
async fn main() -> chargepark::Result<()> {
    println!("=== Charging Session ===\n");

    let mut config = ParkConfig::default();
    config.charger.tick_interval_ms = 50;
    config.charger.step = 10;

    let bus = Arc::new(InMemoryBus::new());
    let reporter = MemoryReporter::new();
    let panel = MemoryIndicator::new();
    let park = ChargePark::start(
        &config,
        bus.clone(),
        Arc::new(reporter.clone()),
        panel.clone(),
    )?;
    let car = CarStation::start(&config, bus.clone())?;

    let charger_state = || park.driver().state_of(CHARGER_ID).unwrap_or("unknown");
    println!("Charger: {}, light: {}", charger_state(), panel.color());

    car.connect();
    pause().await;
    println!("Car connected -> charger: {}, light: {}", charger_state(), panel.color());

    let config_message = Message::of(ChargerTrigger::Config, Args::from([40, 80]));
    bus.publish_message(&config.bus.charger_topic, &config_message)?;
    pause().await;
    println!("Goal set (40 -> 80) -> charger: {}", charger_state());

    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("After charging -> charger: {}, light: {}", charger_state(), panel.color());

    car.disconnect();
    pause().await;
    println!("Car disconnected -> charger: {}, light: {}\n", charger_state(), panel.color());

    println!("Reports sent to the dashboard:");
    for report in reporter.reports() {
        match (report.charging_percentage, report.charging_goal) {
            (Some(percentage), Some(goal)) => {
                println!("  {:?} {percentage}/{goal}", report.state)
            }
            _ => println!("  {:?}", report.state),
        }
    }

    car.shutdown();
    park.shutdown();

    println!("\n=== Example Complete ===");
    Ok(())
}
